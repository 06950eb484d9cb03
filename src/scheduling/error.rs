use thiserror::Error;
use uuid::Uuid;

use super::slot::TimeSlot;
use crate::error::{StoreError, APPOINTMENT_SLOT_KEY};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("time slot {0} is already booked")]
    SlotConflict(TimeSlot),
    #[error("appointment {0} not found")]
    NotFound(Uuid),
    #[error("permission denied: only the owner or an admin can modify this appointment")]
    PermissionDenied,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScheduleError {
    /// A unique violation on the slot column is a lost race, not an outage.
    pub(crate) fn from_write(err: StoreError, slot: TimeSlot) -> Self {
        if err.is_duplicate(APPOINTMENT_SLOT_KEY) {
            ScheduleError::SlotConflict(slot)
        } else {
            ScheduleError::Store(err)
        }
    }
}
