use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Identity, Role};

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_rest_url: String,
    pub database_api_key: String,
    pub database_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_rest_url: "http://localhost:54321".to_string(),
            database_api_key: "test-api-key".to_string(),
            database_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock storage server (wiremock's `uri()`).
    pub fn with_store_url(url: &str) -> Self {
        Self {
            database_rest_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_rest_url: self.database_rest_url.clone(),
            database_api_key: self.database_api_key.clone(),
            database_service_key: self.database_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            environment: "test".to_string(),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestIdentity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Default for TestIdentity {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: Role::Patient,
        }
    }
}

impl TestIdentity {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: Some(self.email.clone()),
            role: self.role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(identity: &TestIdentity, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": identity.id,
            "email": identity.email,
            "role": identity.role.to_string(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(identity: &TestIdentity, secret: &str) -> String {
        Self::create_test_token(identity, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(identity: &TestIdentity) -> String {
        Self::create_test_token(identity, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned storage rows matching the tables the cells read and write.
/// Integration tests mount these on a wiremock server standing in for the
/// PostgREST API.
pub struct MockStoreResponses;

impl MockStoreResponses {
    /// Row consumed by the auth middleware's account probe.
    pub fn account_status_row(account_id: Uuid, is_active: bool) -> serde_json::Value {
        json!([{
            "id": account_id,
            "is_active": is_active
        }])
    }

    pub fn account_row(identity: &TestIdentity, password_hash: &str) -> serde_json::Value {
        json!({
            "id": identity.id,
            "email": identity.email,
            "full_name": "Test Account",
            "role": identity.role.to_string(),
            "password_hash": password_hash,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn clinic_row(clinic_id: Uuid, name: &str) -> serde_json::Value {
        json!({
            "id": clinic_id,
            "name": name,
            "address": "Av. Siempreviva 742",
            "city": "Buenos Aires",
            "phone": "+54 11 5555 0100",
            "photo_url": null,
            "lat": null,
            "lng": null
        })
    }

    pub fn doctor_row(doctor_id: Uuid, user_id: Option<Uuid>) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "user_id": user_id,
            "name": "Dra. Ana Suarez",
            "specialty": "Cardiology",
            "email": "ana@clinic.test",
            "phone": null,
            "license": "MN 12345",
            "color": "#5560eb",
            "photo_url": null,
            "sex": "female",
            "birth_date": null
        })
    }

    pub fn patient_row(patient_id: Uuid, user_id: Option<Uuid>) -> serde_json::Value {
        json!({
            "id": patient_id,
            "user_id": user_id,
            "name": "Bruno Diaz",
            "email": "bruno@example.test",
            "doc_id": "30111222",
            "phone": null,
            "notes": null,
            "insurance_provider": null,
            "insurance_plan": null,
            "insurance_member_id": null,
            "photo_url": null,
            "sex": "male",
            "birth_date": null
        })
    }

    pub fn clinic_doctor_link(clinic_id: Uuid, doctor_id: Uuid) -> serde_json::Value {
        json!([{
            "clinic_id": clinic_id,
            "doctor_id": doctor_id
        }])
    }

    pub fn clinic_patient_link(clinic_id: Uuid, patient_id: Uuid) -> serde_json::Value {
        json!([{
            "clinic_id": clinic_id,
            "patient_id": patient_id
        }])
    }

    #[allow(clippy::too_many_arguments)]
    pub fn appointment_row(
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        clinic_id: Uuid,
        starts_at: &str,
        ends_at: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "starts_at": starts_at,
            "ends_at": ends_at,
            "type": "presencial",
            "status": status
        })
    }

    pub fn empty_rows() -> serde_json::Value {
        json!([])
    }
}
