use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{Identity, TokenResponse};
use shared_models::error::AppError;
use shared_utils::jwt::issue_token;

use crate::models::{AccountPublic, LoginRequest, LoginResponse, RegisterRequest};
use crate::services::AccountService;

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.full_name.trim().len() < 2 {
        return Err(AppError::Validation(
            "Full name must be at least 2 characters".to_string(),
        ));
    }
    if request.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let service = AccountService::new(&state);
    let account = service.register(request).await?;

    let public: AccountPublic = account.into();
    Ok((StatusCode::CREATED, Json(json!(public))))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let service = AccountService::new(&state);
    let account = service.verify_credentials(&request).await?;

    debug!("Issuing token for account: {}", account.id);
    let token = issue_token(
        account.id,
        account.role,
        Some(&account.email),
        &state.jwt_secret,
    )
    .map_err(AppError::Internal)?;

    Ok(Json(LoginResponse::bearer(token)))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(&state);
    let account = service.fetch_by_id(identity.id).await?;

    let public: AccountPublic = account.into();
    Ok(Json(json!(public)))
}

/// Echo of what the middleware resolved from the bearer token.
#[axum::debug_handler]
pub async fn validate(
    Extension(identity): Extension<Identity>,
) -> Result<Json<TokenResponse>, AppError> {
    Ok(Json(TokenResponse {
        valid: true,
        user_id: identity.id,
        email: identity.email,
        role: identity.role,
    }))
}
