use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::auth::Role;
use shared_models::error::AppError;

use crate::models::{AccountRecord, LoginRequest, RegisterRequest};
use crate::services::password::{hash_password, verify_password};

pub struct AccountService {
    store: PostgrestClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    async fn fetch_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AppError> {
        let path = format!("/users?email=eq.{}", urlencoding::encode(email));
        let rows: Vec<AccountRecord> = self.store.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn fetch_by_id(&self, account_id: Uuid) -> Result<AccountRecord, AppError> {
        let path = format!("/users?id=eq.{}", account_id);
        let rows: Vec<AccountRecord> = self.store.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AccountRecord, AppError> {
        let email = request.email.trim().to_lowercase();
        debug!("Registering account: {}", email);

        if self.fetch_by_email(&email).await?.is_some() {
            return Err(AppError::Validation("Email already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|_| AppError::Internal("Password hashing failed".to_string()))?;

        let row = json!({
            "id": Uuid::new_v4(),
            "email": email,
            "full_name": request.full_name,
            "role": request.role.unwrap_or(Role::Patient),
            "password_hash": password_hash,
            "is_active": true,
            "created_at": Utc::now(),
        });

        let created: Vec<AccountRecord> = self
            .store
            .request_returning(Method::POST, "/users", Some(row))
            .await?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create account".to_string()))
    }

    /// Unknown email and wrong password produce the same error.
    pub async fn verify_credentials(
        &self,
        request: &LoginRequest,
    ) -> Result<AccountRecord, AppError> {
        let email = request.email.trim().to_lowercase();

        let account = self
            .fetch_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

        let matches = verify_password(&request.password, &account.password_hash)
            .map_err(|_| AppError::Internal("Password verification failed".to_string()))?;
        if !matches {
            return Err(AppError::Auth("Invalid email or password".to_string()));
        }

        if !account.is_active {
            return Err(AppError::Permission("Account is inactive".to_string()));
        }

        Ok(account)
    }
}
