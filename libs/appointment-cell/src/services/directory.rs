use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::error::AppError;

/// Directory rows the scheduler validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryEntity {
    Doctor,
    Patient,
    Clinic,
}

impl DirectoryEntity {
    fn table(&self) -> &'static str {
        match self {
            DirectoryEntity::Doctor => "doctors",
            DirectoryEntity::Patient => "patients",
            DirectoryEntity::Clinic => "clinics",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DirectoryEntity::Doctor => "Doctor",
            DirectoryEntity::Patient => "Patient",
            DirectoryEntity::Clinic => "Clinic",
        }
    }
}

/// Read-only view of the directory store: existence probes, clinic
/// membership links, and login-account to profile resolution.
pub struct DirectoryGateway {
    store: PostgrestClient,
}

impl DirectoryGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    pub async fn exists(&self, entity: DirectoryEntity, id: Uuid) -> Result<bool, AppError> {
        let path = format!("/{}?id=eq.{}&select=id&limit=1", entity.table(), id);
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    pub async fn is_clinic_doctor(&self, clinic_id: Uuid, doctor_id: Uuid) -> Result<bool, AppError> {
        let path = format!(
            "/clinic_doctors?clinic_id=eq.{}&doctor_id=eq.{}&select=doctor_id&limit=1",
            clinic_id, doctor_id
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    pub async fn is_clinic_patient(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
    ) -> Result<bool, AppError> {
        let path = format!(
            "/clinic_patients?clinic_id=eq.{}&patient_id=eq.{}&select=patient_id&limit=1",
            clinic_id, patient_id
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    /// Doctor profile linked to a login account, if one exists.
    pub async fn linked_doctor_id(&self, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.linked_profile_id("doctors", user_id).await
    }

    /// Patient profile linked to a login account, if one exists.
    pub async fn linked_patient_id(&self, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.linked_profile_id("patients", user_id).await
    }

    async fn linked_profile_id(&self, table: &str, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
        #[derive(serde::Deserialize)]
        struct IdRow {
            id: Uuid,
        }

        let path = format!("/{}?user_id=eq.{}&select=id&limit=1", table, user_id);
        let rows: Vec<IdRow> = self.store.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }
}
