use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

/// Minimal account projection used by the request-auth path.
#[derive(Debug, Deserialize)]
pub struct AccountStatus {
    pub id: Uuid,
    pub is_active: bool,
}

/// HTTP client for the PostgREST-style relational API every cell persists
/// through. Paths are table paths (`/appointments?doctor_id=eq.{id}`);
/// filters, ordering and pagination travel as query parameters.
#[derive(Clone)]
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.database_rest_url.trim_end_matches('/').to_string(),
            api_key: config.database_api_key.clone(),
            service_key: config.database_service_key.clone(),
        }
    }

    fn headers(&self, prefer: Option<&str>) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| AppError::Internal("Invalid storage API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // All requests run under the service role; callers are authorized
        // before any storage call is made.
        let bearer = if self.service_key.is_empty() {
            &self.api_key
        } else {
            &self.service_key
        };
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|_| AppError::Internal("Invalid storage credential".to_string()))?,
        );

        if let Some(prefer_value) = prefer {
            headers.insert(
                "Prefer",
                HeaderValue::from_str(prefer_value)
                    .map_err(|_| AppError::Internal("Invalid Prefer header".to_string()))?,
            );
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        prefer: Option<&str>,
    ) -> Result<reqwest::Response, AppError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Storage request: {} {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(prefer)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Storage API unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Storage API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => AppError::Auth(format!("Storage rejected credentials: {}", error_text)),
                404 => AppError::NotFound(format!("Resource not found: {}", error_text)),
                409 => AppError::Conflict(format!("Storage conflict: {}", error_text)),
                500..=599 => AppError::Database(format!("Storage API error: {}", error_text)),
                _ => AppError::ExternalService(format!(
                    "Storage API error ({}): {}",
                    status, error_text
                )),
            });
        }

        Ok(response)
    }

    /// Issues a request and decodes the JSON response body.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Database(format!("Invalid storage response: {}", e)))
    }

    /// Write variant that asks the store to echo the affected rows back
    /// (`Prefer: return=representation`), so inserts and patches return the
    /// persisted record without a second round trip.
    pub async fn request_returning<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(method, path, body, Some("return=representation"))
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Database(format!("Invalid storage response: {}", e)))
    }

    /// Fire-and-check variant for writes whose response body is irrelevant
    /// (deletes, link-table inserts, lock rows). The store answers 204 for
    /// these unless asked otherwise, so no decoding is attempted.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(), AppError> {
        self.send(method, path, body, Some("return=minimal"))
            .await
            .map(|_| ())
    }

    /// Looks up whether an account row still exists and is active. Every
    /// protected request passes through this before its handler runs.
    pub async fn fetch_account_status(
        &self,
        account_id: Uuid,
    ) -> Result<Option<AccountStatus>, AppError> {
        let path = format!("/users?id=eq.{}&select=id,is_active", account_id);
        let rows: Vec<AccountStatus> = self.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
