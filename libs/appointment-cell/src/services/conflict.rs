use chrono::NaiveDateTime;
use reqwest::Method;
use tracing::{debug, warn};
use serde::Deserialize;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::error::AppError;

use crate::models::AppointmentStatus;

/// Half-open interval intersection: `[s1, e1)` meets `[s2, e2)` iff each
/// starts before the other ends. Touching endpoints are not an overlap, so
/// back-to-back bookings are legal.
pub fn intervals_overlap(
    s1: NaiveDateTime,
    e1: NaiveDateTime,
    s2: NaiveDateTime,
    e2: NaiveDateTime,
) -> bool {
    s1 < e2 && s2 < e1
}

#[derive(Debug, Deserialize)]
struct BookedInterval {
    id: Uuid,
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
    status: AppointmentStatus,
}

/// Read-only conflict probe over the appointment store. Owns no state; the
/// atomicity of check-then-write is the scheduling service's concern.
pub struct ConflictService {
    store: PostgrestClient,
}

impl ConflictService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    /// True when any non-cancelled appointment for the same doctor at the
    /// same clinic intersects the candidate window. `exclude_appointment_id`
    /// keeps a record being rescheduled from conflicting with itself.
    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        debug!(
            "Checking conflicts for doctor {} at clinic {} from {} to {}",
            doctor_id, clinic_id, starts_at, ends_at
        );

        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("clinic_id=eq.{}", clinic_id),
            "status=neq.cancelled".to_string(),
            format!("starts_at=lt.{}", encode_ts(ends_at)),
            format!("ends_at=gt.{}", encode_ts(starts_at)),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/appointments?{}&select=id,starts_at,ends_at,status&order=starts_at.asc",
            query_parts.join("&")
        );

        let candidates: Vec<BookedInterval> = self.store.request(Method::GET, &path, None).await?;

        // The store already filtered on the interval test; re-apply it here
        // so a permissive store cannot widen the rule.
        let conflicting: Vec<&BookedInterval> = candidates
            .iter()
            .filter(|booked| booked.status.blocks_slot())
            .filter(|booked| Some(booked.id) != exclude_appointment_id)
            .filter(|booked| {
                intervals_overlap(starts_at, ends_at, booked.starts_at, booked.ends_at)
            })
            .collect();

        if !conflicting.is_empty() {
            warn!(
                "Conflict detected for doctor {} at clinic {}: {} overlapping appointments",
                doctor_id,
                clinic_id,
                conflicting.len()
            );
        }

        Ok(!conflicting.is_empty())
    }
}

pub(crate) fn encode_ts(value: NaiveDateTime) -> String {
    urlencoding::encode(&value.format("%Y-%m-%dT%H:%M:%S").to_string()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hm: &str) -> NaiveDateTime {
        format!("2025-01-10T{hm}:00").parse().unwrap()
    }

    #[test]
    fn overlapping_windows_are_detected() {
        // Candidate [10:15, 10:45) against existing [10:00, 10:30).
        assert!(intervals_overlap(t("10:15"), t("10:45"), t("10:00"), t("10:30")));
        // Containment both ways.
        assert!(intervals_overlap(t("10:00"), t("11:00"), t("10:15"), t("10:30")));
        assert!(intervals_overlap(t("10:15"), t("10:30"), t("10:00"), t("11:00")));
        // Identical interval.
        assert!(intervals_overlap(t("10:00"), t("10:30"), t("10:00"), t("10:30")));
    }

    #[test]
    fn back_to_back_is_not_an_overlap() {
        assert!(!intervals_overlap(t("10:30"), t("11:00"), t("10:00"), t("10:30")));
        assert!(!intervals_overlap(t("09:00"), t("10:00"), t("10:00"), t("10:30")));
    }

    #[test]
    fn disjoint_windows_do_not_overlap() {
        assert!(!intervals_overlap(t("08:00"), t("08:30"), t("10:00"), t("10:30")));
        assert!(!intervals_overlap(t("12:00"), t("12:30"), t("10:00"), t("10:30")));
    }

    #[test]
    fn timestamps_are_url_encoded_for_the_store() {
        assert_eq!(encode_ts(t("10:00")), "2025-01-10T10%3A00%3A00");
    }
}
