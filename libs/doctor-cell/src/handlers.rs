use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{Identity, Role};
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, DoctorListQuery, UpdateDoctorRequest};
use crate::services::doctor::DoctorService;

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    identity.require_role(&[Role::Admin])?;

    let service = DoctorService::new(&state);
    let doctor = service.create_doctor(request).await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Extension(_identity): Extension<Identity>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctors = service.list_doctors(&query).await?;

    Ok(Json(json!(doctors)))
}

/// Profile of the doctor tied to the calling account.
#[axum::debug_handler]
pub async fn get_my_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[Role::Doctor])?;

    let service = DoctorService::new(&state);
    let doctor = service
        .get_doctor_by_user(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No doctor profile linked to this account".to_string()))?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(_identity): Extension<Identity>,
    Path(doctor_id): Path<uuid::Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctor = service.get_doctor(doctor_id).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(doctor_id): Path<uuid::Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctor = service.get_doctor(doctor_id).await?;

    let is_own_profile = identity.role == Role::Doctor && doctor.user_id == Some(identity.id);
    if !identity.is_admin() && !is_own_profile {
        return Err(AppError::Permission(
            "Not enough permissions to modify this doctor".to_string(),
        ));
    }

    let updated = service.update_doctor(doctor_id, request).await?;
    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(doctor_id): Path<uuid::Uuid>,
) -> Result<StatusCode, AppError> {
    identity.require_role(&[Role::Admin])?;

    let service = DoctorService::new(&state);
    service.get_doctor(doctor_id).await?;
    service.delete_doctor(doctor_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn assign_clinic(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path((doctor_id, clinic_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<StatusCode, AppError> {
    identity.require_role(&[Role::Admin])?;

    let service = DoctorService::new(&state);
    service.get_doctor(doctor_id).await?;
    if !service.clinic_exists(clinic_id).await? {
        return Err(AppError::NotFound("Clinic not found".to_string()));
    }

    service.assign_clinic(doctor_id, clinic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn unassign_clinic(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path((doctor_id, clinic_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<StatusCode, AppError> {
    identity.require_role(&[Role::Admin])?;

    let service = DoctorService::new(&state);
    service.unassign_clinic(doctor_id, clinic_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
