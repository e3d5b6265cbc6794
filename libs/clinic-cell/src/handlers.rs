use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Identity, Role};
use shared_models::error::AppError;

use crate::models::{ClinicListQuery, CreateClinicRequest};
use crate::services::ClinicService;

#[axum::debug_handler]
pub async fn create_clinic(
    State(config): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    identity.require_role(&[Role::Admin])?;

    let service = ClinicService::new(&config);
    let clinic = service.create_clinic(request).await?;

    Ok((StatusCode::CREATED, Json(json!(clinic))))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(config): State<Arc<AppConfig>>,
    Extension(_identity): Extension<Identity>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);
    let clinic = service.get_clinic(clinic_id).await?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn list_clinics(
    State(config): State<Arc<AppConfig>>,
    Extension(_identity): Extension<Identity>,
    Query(query): Query<ClinicListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);
    let clinics = service.list_clinics(query).await?;

    Ok(Json(json!(clinics)))
}
