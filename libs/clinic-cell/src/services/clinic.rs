use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::error::AppError;

use crate::models::{Clinic, ClinicListQuery, CreateClinicRequest};

pub struct ClinicService {
    store: PostgrestClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    pub async fn create_clinic(&self, request: CreateClinicRequest) -> Result<Clinic, AppError> {
        debug!("Creating clinic: {}", request.name);

        let clinic_data = json!({
            "id": Uuid::new_v4(),
            "name": request.name,
            "address": request.address,
            "city": request.city,
            "phone": request.phone,
            "photo_url": request.photo_url,
            "lat": request.lat,
            "lng": request.lng
        });

        let created: Vec<Clinic> = self
            .store
            .request_returning(Method::POST, "/clinics", Some(clinic_data))
            .await?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create clinic".to_string()))
    }

    pub async fn get_clinic(&self, clinic_id: Uuid) -> Result<Clinic, AppError> {
        let path = format!("/clinics?id=eq.{}", clinic_id);
        let rows: Vec<Clinic> = self.store.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Clinic not found".to_string()))
    }

    pub async fn list_clinics(&self, query: ClinicListQuery) -> Result<Vec<Clinic>, AppError> {
        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0);

        let path = format!("/clinics?order=name.asc&limit={}&offset={}", limit, offset);
        self.store.request(Method::GET, &path, None).await
    }
}
