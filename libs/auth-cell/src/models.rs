use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::Role;

/// Full account row as stored, including the password hash.
/// Never serialize this back to callers.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPublic {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<AccountRecord> for AccountPublic {
    fn from(record: AccountRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            full_name: record.full_name,
            role: record.role,
            is_active: record.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

impl LoginResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_view_drops_the_hash() {
        let record = AccountRecord {
            id: Uuid::new_v4(),
            email: "ana@clinic.test".to_string(),
            full_name: "Ana Suarez".to_string(),
            role: Role::Doctor,
            password_hash: "$argon2id$stub".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        let public: AccountPublic = record.into();
        let wire = serde_json::to_value(&public).unwrap();
        assert!(wire.get("password_hash").is_none());
        assert_eq!(wire["role"], "doctor");
    }
}
