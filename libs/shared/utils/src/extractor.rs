use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::auth::Identity;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Bearer-auth middleware. Validates the token, confirms the account it
/// names still exists and is active, and attaches the resulting
/// [`Identity`] to the request extensions for handlers downstream.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let identity = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    let store = PostgrestClient::new(&config);
    match store.fetch_account_status(identity.id).await? {
        Some(status) if status.is_active => {}
        Some(_) => return Err(AppError::Auth("Account is inactive".to_string())),
        None => return Err(AppError::Auth("Account no longer exists".to_string())),
    }

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Pulls the [`Identity`] the auth middleware attached to the request.
pub fn extract_identity<B>(request: &Request<B>) -> Result<Identity, AppError> {
    request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::Auth("Identity not found in request extensions".to_string()))
}
