use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{repo_types::Appointment, slot::TimeSlot};

/// Body for booking; `time_slot` is `HH:MM` (today, UTC) or `YYYY-MM-DD HH:MM`.
#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub time_slot: String,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub time_slot: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub time_slot: TimeSlot,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            time_slot: a.time_slot,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}
