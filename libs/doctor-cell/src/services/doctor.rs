use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, Doctor, DoctorListQuery, UpdateDoctorRequest};

#[derive(Debug, Deserialize)]
struct DoctorLink {
    doctor_id: Uuid,
}

pub struct DoctorService {
    store: PostgrestClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, AppError> {
        debug!("Creating doctor profile: {}", request.name);

        let row = json!({
            "id": Uuid::new_v4(),
            "user_id": request.user_id,
            "name": request.name,
            "specialty": request.specialty,
            "email": request.email,
            "phone": request.phone,
            "license": request.license,
            "color": request.color,
            "photo_url": request.photo_url,
            "sex": request.sex,
            "birth_date": request.birth_date,
        });

        let created: Vec<Doctor> = self
            .store
            .request_returning(Method::POST, "/doctors", Some(row))
            .await?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create doctor".to_string()))
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, AppError> {
        let path = format!("/doctors?id=eq.{}", doctor_id);
        let rows: Vec<Doctor> = self.store.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))
    }

    /// Looks up the doctor profile linked to a login account, if any.
    pub async fn get_doctor_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>, AppError> {
        let path = format!("/doctors?user_id=eq.{}", user_id);
        let rows: Vec<Doctor> = self.store.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next())
    }

    pub async fn list_doctors(&self, query: &DoctorListQuery) -> Result<Vec<Doctor>, AppError> {
        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0);

        // Clinic filtering goes through the membership table first.
        if let Some(clinic_id) = query.clinic_id {
            let links_path = format!(
                "/clinic_doctors?clinic_id=eq.{}&select=doctor_id",
                clinic_id
            );
            let links: Vec<DoctorLink> = self.store.request(Method::GET, &links_path, None).await?;

            if links.is_empty() {
                return Ok(Vec::new());
            }

            let ids = links
                .iter()
                .map(|link| link.doctor_id.to_string())
                .collect::<Vec<_>>()
                .join(",");

            let path = format!(
                "/doctors?id=in.({})&order=name.asc&limit={}&offset={}",
                ids, limit, offset
            );
            return self.store.request(Method::GET, &path, None).await;
        }

        let path = format!("/doctors?order=name.asc&limit={}&offset={}", limit, offset);
        self.store.request(Method::GET, &path, None).await
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, AppError> {
        debug!("Updating doctor profile: {}", doctor_id);

        let mut patch = serde_json::Map::new();
        if let Some(user_id) = request.user_id {
            patch.insert("user_id".to_string(), json!(user_id));
        }
        if let Some(name) = request.name {
            patch.insert("name".to_string(), json!(name));
        }
        if let Some(specialty) = request.specialty {
            patch.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(email) = request.email {
            patch.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            patch.insert("phone".to_string(), json!(phone));
        }
        if let Some(license) = request.license {
            patch.insert("license".to_string(), json!(license));
        }
        if let Some(color) = request.color {
            patch.insert("color".to_string(), json!(color));
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
            return self.get_doctor(doctor_id).await;
        }

        let path = format!("/doctors?id=eq.{}", doctor_id);
        let updated: Vec<Doctor> = self
            .store
            .request_returning(Method::PATCH, &path, Some(Value::Object(patch)))
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))
    }

    /// Removes the doctor after clearing clinic memberships that point at it.
    pub async fn delete_doctor(&self, doctor_id: Uuid) -> Result<(), AppError> {
        debug!("Deleting doctor profile: {}", doctor_id);

        let links_path = format!("/clinic_doctors?doctor_id=eq.{}", doctor_id);
        self.store.execute(Method::DELETE, &links_path, None).await?;

        let path = format!("/doctors?id=eq.{}", doctor_id);
        self.store.execute(Method::DELETE, &path, None).await
    }

    pub async fn clinic_exists(&self, clinic_id: Uuid) -> Result<bool, AppError> {
        let path = format!("/clinics?id=eq.{}&select=id&limit=1", clinic_id);
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    pub async fn is_assigned(&self, doctor_id: Uuid, clinic_id: Uuid) -> Result<bool, AppError> {
        let path = format!(
            "/clinic_doctors?clinic_id=eq.{}&doctor_id=eq.{}&select=doctor_id",
            clinic_id, doctor_id
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    /// Adds the doctor to a clinic roster. Repeating an existing assignment is a no-op.
    pub async fn assign_clinic(&self, doctor_id: Uuid, clinic_id: Uuid) -> Result<(), AppError> {
        if self.is_assigned(doctor_id, clinic_id).await? {
            debug!(
                "Doctor {} already assigned to clinic {}, skipping",
                doctor_id, clinic_id
            );
            return Ok(());
        }

        let link = json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "doctor_id": doctor_id,
        });
        self.store
            .execute(Method::POST, "/clinic_doctors", Some(link))
            .await
    }

    pub async fn unassign_clinic(&self, doctor_id: Uuid, clinic_id: Uuid) -> Result<(), AppError> {
        let path = format!(
            "/clinic_doctors?clinic_id=eq.{}&doctor_id=eq.{}",
            clinic_id, doctor_id
        );
        self.store.execute(Method::DELETE, &path, None).await
    }
}
