use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// Login account linked to this profile, when the patient can sign in.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    /// National identity document number.
    pub doc_id: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_plan: Option<String>,
    pub insurance_member_id: Option<String>,
    pub photo_url: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub doc_id: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_plan: Option<String>,
    pub insurance_member_id: Option<String>,
    pub photo_url: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub doc_id: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_plan: Option<String>,
    pub insurance_member_id: Option<String>,
    pub photo_url: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientListQuery {
    pub clinic_id: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
