use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, Patient, PatientListQuery, UpdatePatientRequest};

#[derive(Debug, Deserialize)]
struct PatientLink {
    patient_id: Uuid,
}

pub struct PatientService {
    store: PostgrestClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, AppError> {
        debug!("Creating patient record: {}", request.name);

        let row = json!({
            "id": Uuid::new_v4(),
            "user_id": request.user_id,
            "name": request.name,
            "email": request.email,
            "doc_id": request.doc_id,
            "phone": request.phone,
            "notes": request.notes,
            "insurance_provider": request.insurance_provider,
            "insurance_plan": request.insurance_plan,
            "insurance_member_id": request.insurance_member_id,
            "photo_url": request.photo_url,
            "sex": request.sex,
            "birth_date": request.birth_date,
        });

        let created: Vec<Patient> = self
            .store
            .request_returning(Method::POST, "/patients", Some(row))
            .await?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create patient".to_string()))
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, AppError> {
        let path = format!("/patients?id=eq.{}", patient_id);
        let rows: Vec<Patient> = self.store.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
    }

    /// Looks up the patient record linked to a login account, if any.
    pub async fn get_patient_by_user(&self, user_id: Uuid) -> Result<Option<Patient>, AppError> {
        let path = format!("/patients?user_id=eq.{}", user_id);
        let rows: Vec<Patient> = self.store.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next())
    }

    pub async fn list_patients(&self, query: &PatientListQuery) -> Result<Vec<Patient>, AppError> {
        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0);

        // Clinic filtering goes through the membership table first.
        if let Some(clinic_id) = query.clinic_id {
            let links_path = format!(
                "/clinic_patients?clinic_id=eq.{}&select=patient_id",
                clinic_id
            );
            let links: Vec<PatientLink> =
                self.store.request(Method::GET, &links_path, None).await?;

            if links.is_empty() {
                return Ok(Vec::new());
            }

            let ids = links
                .iter()
                .map(|link| link.patient_id.to_string())
                .collect::<Vec<_>>()
                .join(",");

            let path = format!(
                "/patients?id=in.({})&order=name.asc&limit={}&offset={}",
                ids, limit, offset
            );
            return self.store.request(Method::GET, &path, None).await;
        }

        let path = format!("/patients?order=name.asc&limit={}&offset={}", limit, offset);
        self.store.request(Method::GET, &path, None).await
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, AppError> {
        debug!("Updating patient record: {}", patient_id);

        let mut patch = serde_json::Map::new();
        if let Some(user_id) = request.user_id {
            patch.insert("user_id".to_string(), json!(user_id));
        }
        if let Some(name) = request.name {
            patch.insert("name".to_string(), json!(name));
        }
        if let Some(email) = request.email {
            patch.insert("email".to_string(), json!(email));
        }
        if let Some(doc_id) = request.doc_id {
            patch.insert("doc_id".to_string(), json!(doc_id));
        }
        if let Some(phone) = request.phone {
            patch.insert("phone".to_string(), json!(phone));
        }
        if let Some(notes) = request.notes {
            patch.insert("notes".to_string(), json!(notes));
        }
        if let Some(provider) = request.insurance_provider {
            patch.insert("insurance_provider".to_string(), json!(provider));
        }
        if let Some(plan) = request.insurance_plan {
            patch.insert("insurance_plan".to_string(), json!(plan));
        }
        if let Some(member_id) = request.insurance_member_id {
            patch.insert("insurance_member_id".to_string(), json!(member_id));
        }
        if let Some(photo_url) = request.photo_url {
            patch.insert("photo_url".to_string(), json!(photo_url));
        }
        if let Some(sex) = request.sex {
            patch.insert("sex".to_string(), json!(sex));
        }
        if let Some(birth_date) = request.birth_date {
            patch.insert("birth_date".to_string(), json!(birth_date));
        }

        if patch.is_empty() {
            return self.get_patient(patient_id).await;
        }

        let path = format!("/patients?id=eq.{}", patient_id);
        let updated: Vec<Patient> = self
            .store
            .request_returning(Method::PATCH, &path, Some(Value::Object(patch)))
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
    }

    /// Removes the patient after clearing clinic memberships that point at it.
    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<(), AppError> {
        debug!("Deleting patient record: {}", patient_id);

        let links_path = format!("/clinic_patients?patient_id=eq.{}", patient_id);
        self.store.execute(Method::DELETE, &links_path, None).await?;

        let path = format!("/patients?id=eq.{}", patient_id);
        self.store.execute(Method::DELETE, &path, None).await
    }

    pub async fn clinic_exists(&self, clinic_id: Uuid) -> Result<bool, AppError> {
        let path = format!("/clinics?id=eq.{}&select=id&limit=1", clinic_id);
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    pub async fn is_assigned(&self, patient_id: Uuid, clinic_id: Uuid) -> Result<bool, AppError> {
        let path = format!(
            "/clinic_patients?clinic_id=eq.{}&patient_id=eq.{}&select=patient_id",
            clinic_id, patient_id
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    /// Adds the patient to a clinic roster. Repeating an existing assignment is a no-op.
    pub async fn assign_clinic(&self, patient_id: Uuid, clinic_id: Uuid) -> Result<(), AppError> {
        if self.is_assigned(patient_id, clinic_id).await? {
            debug!(
                "Patient {} already assigned to clinic {}, skipping",
                patient_id, clinic_id
            );
            return Ok(());
        }

        let link = json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "patient_id": patient_id,
        });
        self.store
            .execute(Method::POST, "/clinic_patients", Some(link))
            .await
    }

    pub async fn unassign_clinic(&self, patient_id: Uuid, clinic_id: Uuid) -> Result<(), AppError> {
        let path = format!(
            "/clinic_patients?clinic_id=eq.{}&patient_id=eq.{}",
            clinic_id, patient_id
        );
        self.store.execute(Method::DELETE, &path, None).await
    }
}
