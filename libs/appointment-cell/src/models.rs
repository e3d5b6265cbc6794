use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    Presencial,
    Virtual,
}

impl Default for AppointmentType {
    fn default() -> Self {
        AppointmentType::Presencial
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Pending
    }
}

impl AppointmentStatus {
    /// Whether a booking in this status holds its time slot. Cancelled
    /// appointments free the slot for rebooking.
    pub fn blocks_slot(&self) -> bool {
        match self {
            AppointmentStatus::Pending | AppointmentStatus::Confirmed => true,
            AppointmentStatus::Cancelled => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

/// A booked slot. Scheduling times are naive/local; the system does no
/// timezone conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    /// Optional for doctor callers; their linked profile fills the gap.
    pub doctor_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    #[serde(rename = "type", default)]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub clinic_id: Option<Uuid>,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    #[serde(rename = "type")]
    pub appointment_type: Option<AppointmentType>,
    pub status: Option<AppointmentStatus>,
}

impl UpdateAppointmentRequest {
    /// A patch touching any of doctor/clinic/start/end moves the slot and
    /// must go back through time validation and the conflict check.
    pub fn touches_slot(&self) -> bool {
        self.doctor_id.is_some()
            || self.clinic_id.is_some()
            || self.starts_at.is_some()
            || self.ends_at.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub clinic_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Missing doctor_id and no doctor profile linked to this account")]
    MissingDoctor,

    #[error("ends_at must be after starts_at")]
    InvalidTimeRange,

    #[error("{0} not found")]
    ReferenceNotFound(&'static str),

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("The doctor does not belong to the clinic")]
    DoctorNotInClinic,

    #[error("The patient does not belong to the clinic")]
    PatientNotInClinic,

    #[error("The requested slot overlaps an existing appointment for this doctor at this clinic")]
    SlotTaken,

    #[error("The slot is being booked by another request, try again")]
    SlotContended,

    #[error("Permission denied for this appointment")]
    PermissionDenied,
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::MissingDoctor
            | SchedulingError::InvalidTimeRange
            | SchedulingError::DoctorNotInClinic
            | SchedulingError::PatientNotInClinic => AppError::Validation(err.to_string()),
            SchedulingError::ReferenceNotFound(_) | SchedulingError::AppointmentNotFound => {
                AppError::NotFound(err.to_string())
            }
            SchedulingError::SlotTaken | SchedulingError::SlotContended => {
                AppError::Conflict(err.to_string())
            }
            SchedulingError::PermissionDenied => AppError::Permission(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn appointment_round_trips_the_flat_wire_form() {
        let row = json!({
            "id": "7c8a4f6e-0f1d-4c8b-9a52-3d2f1e0b9a10",
            "doctor_id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "clinic_id": Uuid::new_v4(),
            "starts_at": "2025-01-10T10:00:00",
            "ends_at": "2025-01-10T10:30:00",
            "type": "virtual",
            "status": "confirmed"
        });

        let appointment: Appointment = serde_json::from_value(row).unwrap();
        assert_eq!(appointment.appointment_type, AppointmentType::Virtual);
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);

        let back = serde_json::to_value(&appointment).unwrap();
        assert_eq!(back["type"], "virtual");
        assert_eq!(back["starts_at"], "2025-01-10T10:00:00");
    }

    #[test]
    fn create_request_defaults_type_and_status() {
        let body = json!({
            "patient_id": Uuid::new_v4(),
            "clinic_id": Uuid::new_v4(),
            "starts_at": "2025-01-10T10:00:00",
            "ends_at": "2025-01-10T10:30:00"
        });

        let request: CreateAppointmentRequest = serde_json::from_value(body).unwrap();
        assert!(request.doctor_id.is_none());
        assert_eq!(request.appointment_type, AppointmentType::Presencial);
        assert_eq!(request.status, AppointmentStatus::Pending);
    }

    #[test]
    fn only_cancelled_status_frees_the_slot() {
        assert!(AppointmentStatus::Pending.blocks_slot());
        assert!(AppointmentStatus::Confirmed.blocks_slot());
        assert!(!AppointmentStatus::Cancelled.blocks_slot());
    }

    #[test]
    fn patch_slot_detection_ignores_status_and_type() {
        let status_only = UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        };
        assert!(!status_only.touches_slot());

        let reschedule = UpdateAppointmentRequest {
            starts_at: Some("2025-01-10T10:05:00".parse().unwrap()),
            ..Default::default()
        };
        assert!(reschedule.touches_slot());
    }

    #[test]
    fn scheduling_errors_map_to_the_http_taxonomy() {
        assert_matches!(
            AppError::from(SchedulingError::InvalidTimeRange),
            AppError::Validation(_)
        );
        assert_matches!(
            AppError::from(SchedulingError::ReferenceNotFound("Doctor")),
            AppError::NotFound(_)
        );
        assert_matches!(AppError::from(SchedulingError::SlotTaken), AppError::Conflict(_));
        assert_matches!(
            AppError::from(SchedulingError::PermissionDenied),
            AppError::Permission(_)
        );
    }
}
