use chrono::{Duration, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::error::AppError;

const LOCK_TTL_SECONDS: i64 = 30;

/// A held slot lock. Dropped rows are reclaimed by the expiry sweep, so a
/// crashed holder cannot wedge a slot for longer than the TTL.
pub struct SlotLock {
    key: String,
}

impl SlotLock {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Serializes concurrent check-then-write sequences per (doctor, clinic).
///
/// The store's unique constraint on `scheduling_locks.lock_key` is the
/// actual serialization point: the first insert wins, the second comes back
/// as a conflict. Two requests for different doctors or clinics derive
/// different keys and never contend.
pub struct SlotLockService {
    store: PostgrestClient,
}

impl SlotLockService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    fn lock_key(doctor_id: Uuid, clinic_id: Uuid) -> String {
        format!("slot_{}_{}", doctor_id, clinic_id)
    }

    /// Tries to take the lock for a (doctor, clinic) pair. On contention the
    /// expired-lock sweep runs once and the insert is retried once; `None`
    /// means a live holder still owns the slot.
    pub async fn acquire(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<SlotLock>, AppError> {
        let key = Self::lock_key(doctor_id, clinic_id);

        match self.try_insert(&key, doctor_id, clinic_id).await {
            Ok(()) => {
                debug!("Scheduling lock acquired: {}", key);
                return Ok(Some(SlotLock { key }));
            }
            Err(AppError::Conflict(_)) => {}
            Err(other) => return Err(other),
        }

        // The key is taken; clear it if its holder expired and try again.
        self.purge_expired(&key).await?;

        match self.try_insert(&key, doctor_id, clinic_id).await {
            Ok(()) => {
                debug!("Scheduling lock acquired after expiry sweep: {}", key);
                Ok(Some(SlotLock { key }))
            }
            Err(AppError::Conflict(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    pub async fn release(&self, lock: SlotLock) -> Result<(), AppError> {
        let path = format!("/scheduling_locks?lock_key=eq.{}", lock.key);
        self.store.execute(Method::DELETE, &path, None).await?;
        debug!("Scheduling lock released: {}", lock.key);
        Ok(())
    }

    async fn try_insert(&self, key: &str, doctor_id: Uuid, clinic_id: Uuid) -> Result<(), AppError> {
        let now = Utc::now();
        let lock_row = json!({
            "id": Uuid::new_v4(),
            "lock_key": key,
            "doctor_id": doctor_id,
            "clinic_id": clinic_id,
            "acquired_at": now.to_rfc3339(),
            "expires_at": (now + Duration::seconds(LOCK_TTL_SECONDS)).to_rfc3339(),
            "holder": format!("scheduler_{}", Uuid::new_v4()),
        });

        self.store
            .execute(Method::POST, "/scheduling_locks", Some(lock_row))
            .await
    }

    async fn purge_expired(&self, key: &str) -> Result<(), AppError> {
        let now = urlencoding::encode(&Utc::now().to_rfc3339()).into_owned();
        let path = format!("/scheduling_locks?lock_key=eq.{}&expires_at=lt.{}", key, now);
        self.store.execute(Method::DELETE, &path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_keys_are_scoped_to_doctor_and_clinic() {
        let doctor = Uuid::new_v4();
        let clinic_a = Uuid::new_v4();
        let clinic_b = Uuid::new_v4();

        // Same pair always contends; a different clinic never does.
        assert_eq!(
            SlotLockService::lock_key(doctor, clinic_a),
            SlotLockService::lock_key(doctor, clinic_a)
        );
        assert_ne!(
            SlotLockService::lock_key(doctor, clinic_a),
            SlotLockService::lock_key(doctor, clinic_b)
        );
    }
}
