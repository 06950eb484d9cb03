use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{repo_types::Appointment, slot::TimeSlot};
use crate::error::StoreError;

/// Durable appointment table. Implementations must be safe to share across
/// tasks; the scheduler serializes slot checks on top of them.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_slot(&self, slot: TimeSlot) -> Result<Option<Appointment>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;
    async fn insert(&self, user_id: Uuid, slot: TimeSlot) -> Result<Appointment, StoreError>;
    /// Persists the appointment's slot. `None` when the row no longer exists.
    async fn update(&self, appointment: &Appointment) -> Result<Option<Appointment>, StoreError>;
    /// `false` when there was nothing to delete.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError>;
    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError>;
}

#[derive(Clone)]
pub struct PgAppointmentStore {
    db: PgPool,
}

impl PgAppointmentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    async fn find_by_slot(&self, slot: TimeSlot) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, user_id, time_slot, created_at, updated_at
            FROM appointments
            WHERE time_slot = $1
            "#,
        )
        .bind(slot)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, user_id, time_slot, created_at, updated_at
            FROM appointments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, user_id: Uuid, slot: TimeSlot) -> Result<Appointment, StoreError> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (user_id, time_slot)
            VALUES ($1, $2)
            RETURNING id, user_id, time_slot, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(slot)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
               SET time_slot = $2, updated_at = now()
             WHERE id = $1
            RETURNING id, user_id, time_slot, created_at, updated_at
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.time_slot)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query(r#"DELETE FROM appointments WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, user_id, time_slot, created_at, updated_at
            FROM appointments
            WHERE user_id = $1
            ORDER BY time_slot ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, user_id, time_slot, created_at, updated_at
            FROM appointments
            ORDER BY time_slot ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
