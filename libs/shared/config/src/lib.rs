use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_rest_url: String,
    pub database_api_key: String,
    pub database_service_key: String,
    pub jwt_secret: String,
    pub environment: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_rest_url: env::var("DATABASE_REST_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_REST_URL not set, using empty value");
                    String::new()
                }),
            database_api_key: env::var("DATABASE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_API_KEY not set, using empty value");
                    String::new()
                }),
            database_service_key: env::var("DATABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_rest_url.is_empty()
            && !self.database_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
