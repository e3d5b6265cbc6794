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

use crate::models::{AppointmentListQuery, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::directory::DirectoryGateway;
use crate::services::SchedulingService;

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    identity.require_role(&[Role::Admin, Role::Doctor])?;

    let service = SchedulingService::new(&state);
    let appointment = service.create_appointment(&identity, request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);
    let appointments = service.list_appointments(&identity, &query).await?;

    Ok(Json(json!(appointments)))
}

/// The calling doctor's own schedule.
#[axum::debug_handler]
pub async fn my_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[Role::Doctor])?;

    let directory = DirectoryGateway::new(&state);
    let doctor_id = directory
        .linked_doctor_id(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No doctor profile linked to this account".to_string()))?;

    let service = SchedulingService::new(&state);
    let appointments = service.list_for_doctor(doctor_id, &query).await?;

    Ok(Json(json!(appointments)))
}

/// The calling patient's own appointments.
#[axum::debug_handler]
pub async fn my_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[Role::Patient])?;

    let directory = DirectoryGateway::new(&state);
    let patient_id = directory
        .linked_patient_id(identity.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No patient profile linked to this account".to_string())
        })?;

    let service = SchedulingService::new(&state);
    let appointments = service.list_for_patient(patient_id, &query).await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);
    let appointment = service.get_appointment(&identity, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(appointment_id): Path<Uuid>,
    Json(patch): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);
    let appointment = service
        .update_appointment(&identity, appointment_id, patch)
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(identity): Extension<Identity>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = SchedulingService::new(&state);
    service.delete_appointment(&identity, appointment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
