//! Process-local stores used with `STORE_BACKEND=memory` and by the tests.
//! They enforce the same unique constraints as the PostgreSQL schema.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{repo::UserStore, repo_types::User},
    error::{StoreError, APPOINTMENT_SLOT_KEY, USERNAME_KEY},
    scheduling::{repo::AppointmentStore, repo_types::Appointment, slot::TimeSlot},
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username == username && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        // soft-deleted rows keep their username reserved, as in the schema
        if users.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate(USERNAME_KEY.into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) if user.deleted_at.is_none() => {
                let now = OffsetDateTime::now_utc();
                user.deleted_at = Some(now);
                user.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_live(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut live: Vec<User> = users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect();
        live.sort_by(|a, b| (a.created_at, &a.username).cmp(&(b.created_at, &b.username)));
        Ok(live)
    }
}

#[derive(Default)]
pub struct MemoryAppointmentStore {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

impl MemoryAppointmentStore {
    fn occupied_by_other(rows: &HashMap<Uuid, Appointment>, slot: TimeSlot, id: Uuid) -> bool {
        rows.values().any(|a| a.time_slot == slot && a.id != id)
    }

    fn sorted(mut rows: Vec<Appointment>) -> Vec<Appointment> {
        rows.sort_by_key(|a| a.time_slot);
        rows
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn find_by_slot(&self, slot: TimeSlot) -> Result<Option<Appointment>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.values().find(|a| a.time_slot == slot).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert(&self, user_id: Uuid, slot: TimeSlot) -> Result<Appointment, StoreError> {
        let mut rows = self.rows.write().await;
        let id = Uuid::new_v4();
        if Self::occupied_by_other(&rows, slot, id) {
            return Err(StoreError::Duplicate(APPOINTMENT_SLOT_KEY.into()));
        }
        let now = OffsetDateTime::now_utc();
        let appointment = Appointment {
            id,
            user_id,
            time_slot: slot,
            created_at: now,
            updated_at: now,
        };
        rows.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Option<Appointment>, StoreError> {
        let mut rows = self.rows.write().await;
        if Self::occupied_by_other(&rows, appointment.time_slot, appointment.id) {
            return Err(StoreError::Duplicate(APPOINTMENT_SLOT_KEY.into()));
        }
        let Some(row) = rows.get_mut(&appointment.id) else {
            return Ok(None);
        };
        row.time_slot = appointment.time_slot;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let rows = self.rows.read().await;
        Ok(Self::sorted(
            rows.values().filter(|a| a.user_id == user_id).cloned().collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        let rows = self.rows.read().await;
        Ok(Self::sorted(rows.values().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn slot_at_nine() -> TimeSlot {
        TimeSlot::new(datetime!(2024-03-05 09:00 UTC))
    }

    #[tokio::test]
    async fn appointment_store_rejects_second_row_for_slot() {
        let store = MemoryAppointmentStore::default();
        store.insert(Uuid::new_v4(), slot_at_nine()).await.unwrap();
        let err = store.insert(Uuid::new_v4(), slot_at_nine()).await.unwrap_err();
        assert!(err.is_duplicate(APPOINTMENT_SLOT_KEY));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_none() {
        let store = MemoryAppointmentStore::default();
        let mut appt = store.insert(Uuid::new_v4(), slot_at_nine()).await.unwrap();
        assert!(store.delete(appt.id).await.unwrap());
        appt.time_slot = TimeSlot::new(datetime!(2024-03-05 10:00 UTC));
        assert!(store.update(&appt).await.unwrap().is_none());
        assert!(!store.delete(appt.id).await.unwrap());
    }

    #[tokio::test]
    async fn soft_deleted_user_is_hidden_but_name_stays_taken() {
        let store = MemoryUserStore::default();
        let user = store.insert("alice", "hash", false).await.unwrap();
        assert!(store.soft_delete(user.id).await.unwrap());
        assert!(!store.soft_delete(user.id).await.unwrap());

        assert!(store.find_by_username("alice").await.unwrap().is_none());
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        let err = store.insert("alice", "hash", false).await.unwrap_err();
        assert!(err.is_duplicate(USERNAME_KEY));
    }
}
