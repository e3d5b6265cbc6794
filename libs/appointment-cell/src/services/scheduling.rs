use reqwest::Method;
use serde_json::{json, Map, Value};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chrono::{NaiveDateTime, Utc};
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::auth::{Identity, Role};
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentListQuery, CreateAppointmentRequest, SchedulingError,
    UpdateAppointmentRequest,
};
use crate::services::conflict::{encode_ts, ConflictService};
use crate::services::directory::{DirectoryEntity, DirectoryGateway};
use crate::services::locks::SlotLockService;

const LOCK_ATTEMPTS: u32 = 3;
const LOCK_BACKOFF_MS: u64 = 100;

enum ListScope {
    All,
    Doctor(Uuid),
    Patient(Uuid),
}

/// The only writer of appointment rows. Every create/update runs the full
/// validation ladder (time order, existence, clinic membership, conflict)
/// and brackets the conflict check plus the write with a slot lock so
/// concurrent bookings for the same doctor and clinic cannot interleave.
pub struct SchedulingService {
    store: PostgrestClient,
    conflicts: ConflictService,
    directory: DirectoryGateway,
    locks: SlotLockService,
}

impl SchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
            conflicts: ConflictService::new(config),
            directory: DirectoryGateway::new(config),
            locks: SlotLockService::new(config),
        }
    }

    pub async fn create_appointment(
        &self,
        identity: &Identity,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppError> {
        // Doctors book for themselves unless they name a doctor explicitly;
        // admins must always name one.
        let doctor_id = match identity.role {
            Role::Doctor => match request.doctor_id {
                Some(id) => Some(id),
                None => self.directory.linked_doctor_id(identity.id).await?,
            },
            Role::Admin => request.doctor_id,
            Role::Patient => return Err(SchedulingError::PermissionDenied.into()),
        }
        .ok_or(SchedulingError::MissingDoctor)?;

        validate_times(request.starts_at, request.ends_at)?;

        self.require_exists(DirectoryEntity::Doctor, doctor_id).await?;
        self.require_exists(DirectoryEntity::Patient, request.patient_id)
            .await?;
        self.require_exists(DirectoryEntity::Clinic, request.clinic_id)
            .await?;

        if !self
            .directory
            .is_clinic_doctor(request.clinic_id, doctor_id)
            .await?
        {
            return Err(SchedulingError::DoctorNotInClinic.into());
        }
        if !self
            .directory
            .is_clinic_patient(request.clinic_id, request.patient_id)
            .await?
        {
            return Err(SchedulingError::PatientNotInClinic.into());
        }

        let lock = self.acquire_with_retry(doctor_id, request.clinic_id).await?;
        let outcome = self.insert_checked(doctor_id, &request).await;
        self.release_or_warn(lock).await;

        let appointment = outcome?;

        info!(
            "Appointment {} booked for doctor {} at clinic {}",
            appointment.id, appointment.doctor_id, appointment.clinic_id
        );
        Ok(appointment)
    }

    pub async fn update_appointment(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
        patch: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppError> {
        let existing = self.get_by_id(appointment_id).await?;
        self.require_edit_rights(identity, &existing).await?;

        let body = patch_body(&patch);

        let effective_clinic = patch.clinic_id.unwrap_or(existing.clinic_id);

        // A swapped patient must exist and belong to the (possibly also
        // swapped) clinic, whether or not the slot itself moves.
        if let Some(patient_id) = patch.patient_id {
            self.require_exists(DirectoryEntity::Patient, patient_id)
                .await?;
            if !self
                .directory
                .is_clinic_patient(effective_clinic, patient_id)
                .await?
            {
                return Err(SchedulingError::PatientNotInClinic.into());
            }
        }

        if !patch.touches_slot() {
            if body.is_empty() {
                return Ok(existing);
            }
            return self.apply_patch(appointment_id, body).await;
        }

        let effective_doctor = patch.doctor_id.unwrap_or(existing.doctor_id);
        let effective_starts = patch.starts_at.unwrap_or(existing.starts_at);
        let effective_ends = patch.ends_at.unwrap_or(existing.ends_at);

        validate_times(effective_starts, effective_ends)?;

        if let Some(doctor_id) = patch.doctor_id {
            self.require_exists(DirectoryEntity::Doctor, doctor_id).await?;
        }
        if let Some(clinic_id) = patch.clinic_id {
            self.require_exists(DirectoryEntity::Clinic, clinic_id).await?;
        }

        if !self
            .directory
            .is_clinic_doctor(effective_clinic, effective_doctor)
            .await?
        {
            return Err(SchedulingError::DoctorNotInClinic.into());
        }
        // Moving to another clinic drags the unchanged patient along; that
        // membership has to hold too.
        if patch.clinic_id.is_some() && patch.patient_id.is_none() {
            if !self
                .directory
                .is_clinic_patient(effective_clinic, existing.patient_id)
                .await?
            {
                return Err(SchedulingError::PatientNotInClinic.into());
            }
        }

        let lock = self
            .acquire_with_retry(effective_doctor, effective_clinic)
            .await?;
        let outcome = self
            .reschedule_checked(
                appointment_id,
                effective_doctor,
                effective_clinic,
                effective_starts,
                effective_ends,
                body,
            )
            .await;
        self.release_or_warn(lock).await;

        outcome
    }

    pub async fn get_appointment(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppError> {
        let appointment = self.get_by_id(appointment_id).await?;

        let allowed = match identity.role {
            Role::Admin => true,
            Role::Doctor => {
                self.directory.linked_doctor_id(identity.id).await?
                    == Some(appointment.doctor_id)
            }
            Role::Patient => {
                self.directory.linked_patient_id(identity.id).await?
                    == Some(appointment.patient_id)
            }
        };

        if !allowed {
            return Err(SchedulingError::PermissionDenied.into());
        }
        Ok(appointment)
    }

    /// Role-scoped listing: admins see everything, doctors and patients only
    /// rows tied to their own linked profile. A doctor or patient account
    /// with no linked profile has nothing to see.
    pub async fn list_appointments(
        &self,
        identity: &Identity,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppError> {
        let scope = match identity.role {
            Role::Admin => ListScope::All,
            Role::Doctor => match self.directory.linked_doctor_id(identity.id).await? {
                Some(doctor_id) => ListScope::Doctor(doctor_id),
                None => return Ok(Vec::new()),
            },
            Role::Patient => match self.directory.linked_patient_id(identity.id).await? {
                Some(patient_id) => ListScope::Patient(patient_id),
                None => return Ok(Vec::new()),
            },
        };

        self.fetch(scope, query).await
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppError> {
        self.fetch(ListScope::Doctor(doctor_id), query).await
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppError> {
        self.fetch(ListScope::Patient(patient_id), query).await
    }

    pub async fn delete_appointment(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
    ) -> Result<(), AppError> {
        let existing = self.get_by_id(appointment_id).await?;
        self.require_edit_rights(identity, &existing).await?;

        let path = format!("/appointments?id=eq.{}", appointment_id);
        self.store.execute(Method::DELETE, &path, None).await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    async fn insert_checked(
        &self,
        doctor_id: Uuid,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, AppError> {
        if self
            .conflicts
            .has_conflict(
                doctor_id,
                request.clinic_id,
                request.starts_at,
                request.ends_at,
                None,
            )
            .await?
        {
            return Err(SchedulingError::SlotTaken.into());
        }

        let row = json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "patient_id": request.patient_id,
            "clinic_id": request.clinic_id,
            "starts_at": request.starts_at,
            "ends_at": request.ends_at,
            "type": request.appointment_type,
            "status": request.status,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created: Vec<Appointment> = self
            .store
            .request_returning(Method::POST, "/appointments", Some(row))
            .await?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create appointment".to_string()))
    }

    async fn reschedule_checked(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        clinic_id: Uuid,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
        body: Map<String, Value>,
    ) -> Result<Appointment, AppError> {
        if self
            .conflicts
            .has_conflict(doctor_id, clinic_id, starts_at, ends_at, Some(appointment_id))
            .await?
        {
            return Err(SchedulingError::SlotTaken.into());
        }

        self.apply_patch(appointment_id, body).await
    }

    async fn apply_patch(
        &self,
        appointment_id: Uuid,
        body: Map<String, Value>,
    ) -> Result<Appointment, AppError> {
        let path = format!("/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Appointment> = self
            .store
            .request_returning(Method::PATCH, &path, Some(Value::Object(body)))
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::AppointmentNotFound.into())
    }

    /// The stale row is reclaimed by the expiry sweep, so a failed release
    /// never invalidates an already-committed write.
    async fn release_or_warn(&self, lock: crate::services::locks::SlotLock) {
        if let Err(err) = self.locks.release(lock).await {
            warn!("Failed to release scheduling lock: {}", err);
        }
    }

    async fn acquire_with_retry(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<crate::services::locks::SlotLock, AppError> {
        for attempt in 1..=LOCK_ATTEMPTS {
            if let Some(lock) = self.locks.acquire(doctor_id, clinic_id).await? {
                return Ok(lock);
            }
            if attempt < LOCK_ATTEMPTS {
                warn!(
                    "Slot lock contended for doctor {} at clinic {}, attempt {}/{}",
                    doctor_id, clinic_id, attempt, LOCK_ATTEMPTS
                );
                sleep(Duration::from_millis(LOCK_BACKOFF_MS * attempt as u64)).await;
            }
        }

        Err(SchedulingError::SlotContended.into())
    }

    async fn require_exists(&self, entity: DirectoryEntity, id: Uuid) -> Result<(), AppError> {
        if self.directory.exists(entity, id).await? {
            Ok(())
        } else {
            Err(SchedulingError::ReferenceNotFound(entity.label()).into())
        }
    }

    /// Edit and delete rights: admin, or the doctor who owns the row.
    async fn require_edit_rights(
        &self,
        identity: &Identity,
        appointment: &Appointment,
    ) -> Result<(), AppError> {
        match identity.role {
            Role::Admin => Ok(()),
            Role::Doctor => {
                let mine = self.directory.linked_doctor_id(identity.id).await?;
                if mine == Some(appointment.doctor_id) {
                    Ok(())
                } else {
                    Err(SchedulingError::PermissionDenied.into())
                }
            }
            Role::Patient => Err(SchedulingError::PermissionDenied.into()),
        }
    }

    async fn get_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppError> {
        let path = format!("/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self.store.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::AppointmentNotFound.into())
    }

    async fn fetch(
        &self,
        scope: ListScope,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppError> {
        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0);

        let mut query_parts = Vec::new();

        match scope {
            ListScope::All => {}
            ListScope::Doctor(doctor_id) => query_parts.push(format!("doctor_id=eq.{}", doctor_id)),
            ListScope::Patient(patient_id) => {
                query_parts.push(format!("patient_id=eq.{}", patient_id))
            }
        }

        if let Some(clinic_id) = query.clinic_id {
            query_parts.push(format!("clinic_id=eq.{}", clinic_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status.as_str()));
        }
        if let Some(date_from) = query.date_from {
            query_parts.push(format!("starts_at=gte.{}", encode_ts(date_from)));
        }
        if let Some(date_to) = query.date_to {
            query_parts.push(format!("starts_at=lt.{}", encode_ts(date_to)));
        }

        query_parts.push("order=starts_at.asc".to_string());
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", offset));

        let path = format!("/appointments?{}", query_parts.join("&"));
        debug!("Listing appointments: {}", path);
        self.store.request(Method::GET, &path, None).await
    }
}

fn validate_times(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> Result<(), AppError> {
    if ends_at <= starts_at {
        return Err(SchedulingError::InvalidTimeRange.into());
    }
    Ok(())
}

fn patch_body(patch: &UpdateAppointmentRequest) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(doctor_id) = patch.doctor_id {
        body.insert("doctor_id".to_string(), json!(doctor_id));
    }
    if let Some(patient_id) = patch.patient_id {
        body.insert("patient_id".to_string(), json!(patient_id));
    }
    if let Some(clinic_id) = patch.clinic_id {
        body.insert("clinic_id".to_string(), json!(clinic_id));
    }
    if let Some(starts_at) = patch.starts_at {
        body.insert("starts_at".to_string(), json!(starts_at));
    }
    if let Some(ends_at) = patch.ends_at {
        body.insert("ends_at".to_string(), json!(ends_at));
    }
    if let Some(appointment_type) = patch.appointment_type {
        body.insert("type".to_string(), json!(appointment_type));
    }
    if let Some(status) = patch.status {
        body.insert("status".to_string(), json!(status));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn zero_length_and_inverted_windows_are_rejected() {
        let at: NaiveDateTime = "2025-01-10T10:00:00".parse().unwrap();
        let later: NaiveDateTime = "2025-01-10T10:30:00".parse().unwrap();

        assert_matches!(validate_times(at, at), Err(AppError::Validation(_)));
        assert_matches!(validate_times(later, at), Err(AppError::Validation(_)));
        assert!(validate_times(at, later).is_ok());
    }

    #[test]
    fn patch_body_carries_only_supplied_fields() {
        let patch = UpdateAppointmentRequest {
            status: Some(crate::models::AppointmentStatus::Cancelled),
            ..Default::default()
        };

        let body = patch_body(&patch);
        assert_eq!(body.len(), 1);
        assert_eq!(body["status"], "cancelled");
    }
}
