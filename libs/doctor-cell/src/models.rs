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
pub struct Doctor {
    pub id: Uuid,
    /// Login account linked to this profile, when the doctor can sign in.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialty: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license: Option<String>,
    pub color: Option<String>,
    pub photo_url: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialty: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license: Option<String>,
    pub color: Option<String>,
    pub photo_url: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license: Option<String>,
    pub color: Option<String>,
    pub photo_url: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorListQuery {
    pub clinic_id: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_rows_deserialize_with_missing_optionals() {
        let row = serde_json::json!({
            "id": Uuid::new_v4(),
            "user_id": null,
            "name": "Dra. Ana Suarez",
            "specialty": "Cardiology",
            "email": null,
            "phone": null,
            "license": null,
            "color": null,
            "photo_url": null,
            "sex": "female",
            "birth_date": null
        });

        let doctor: Doctor = serde_json::from_value(row).unwrap();
        assert_eq!(doctor.sex, Some(Sex::Female));
        assert!(doctor.user_id.is_none());
    }

    #[test]
    fn sex_uses_lowercase_wire_form() {
        assert_eq!(serde_json::to_value(Sex::Other).unwrap(), "other");
    }
}
