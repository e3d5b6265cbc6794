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

use crate::models::{CreatePatientRequest, PatientListQuery, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    identity.require_role(&[Role::Admin, Role::Doctor])?;

    let service = PatientService::new(&state);
    let patient = service.create_patient(request).await?;

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[Role::Admin, Role::Doctor])?;

    let service = PatientService::new(&state);
    let patients = service.list_patients(&query).await?;

    Ok(Json(json!(patients)))
}

/// Record of the patient tied to the calling account.
#[axum::debug_handler]
pub async fn get_my_patient(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[Role::Patient])?;

    let service = PatientService::new(&state);
    let patient = service
        .get_patient_by_user(identity.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No patient record linked to this account".to_string())
        })?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(patient_id): Path<uuid::Uuid>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[Role::Admin, Role::Doctor])?;

    let service = PatientService::new(&state);
    let patient = service.get_patient(patient_id).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(patient_id): Path<uuid::Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);
    let patient = service.get_patient(patient_id).await?;

    let is_own_record = identity.role == Role::Patient && patient.user_id == Some(identity.id);
    if !identity.is_admin() && !is_own_record {
        return Err(AppError::Permission(
            "Not enough permissions to modify this patient".to_string(),
        ));
    }

    let updated = service.update_patient(patient_id, request).await?;
    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(patient_id): Path<uuid::Uuid>,
) -> Result<StatusCode, AppError> {
    identity.require_role(&[Role::Admin])?;

    let service = PatientService::new(&state);
    service.get_patient(patient_id).await?;
    service.delete_patient(patient_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn assign_clinic(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path((patient_id, clinic_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<StatusCode, AppError> {
    identity.require_role(&[Role::Admin, Role::Doctor])?;

    let service = PatientService::new(&state);
    service.get_patient(patient_id).await?;
    if !service.clinic_exists(clinic_id).await? {
        return Err(AppError::NotFound("Clinic not found".to_string()));
    }

    service.assign_clinic(patient_id, clinic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn unassign_clinic(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path((patient_id, clinic_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<StatusCode, AppError> {
    identity.require_role(&[Role::Admin, Role::Doctor])?;

    let service = PatientService::new(&state);
    service.unassign_clinic(patient_id, clinic_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
