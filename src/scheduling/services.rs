use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    error::ScheduleError,
    repo::AppointmentStore,
    repo_types::{Appointment, Requester},
    slot::TimeSlot,
};

/// Allocates time slots so that each slot is held by at most one appointment.
///
/// Book and reschedule run their check-then-write sequence under a single
/// process-wide gate. Cancel touches one row by id and is not gated. The gate
/// only covers this process: running several replicas against one database
/// needs a store-level lock keyed by slot instead, with the unique index on
/// `appointments.time_slot` as the backstop.
pub struct Scheduler {
    store: Arc<dyn AppointmentStore>,
    gate: Mutex<()>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
        }
    }

    #[instrument(skip(self))]
    pub async fn book(&self, user_id: Uuid, slot: TimeSlot) -> Result<Appointment, ScheduleError> {
        let _gate = self.gate.lock().await;

        if let Some(existing) = self.store.find_by_slot(slot).await.map_err(store_failure)? {
            warn!(%slot, holder = %existing.id, "slot already booked");
            return Err(ScheduleError::SlotConflict(slot));
        }

        let appointment = self
            .store
            .insert(user_id, slot)
            .await
            .map_err(|e| ScheduleError::from_write(e, slot))?;
        info!(appointment_id = %appointment.id, %user_id, %slot, "appointment booked");
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_slot: TimeSlot,
        requester: Requester,
    ) -> Result<Appointment, ScheduleError> {
        let _gate = self.gate.lock().await;

        if let Some(occupant) = self.store.find_by_slot(new_slot).await.map_err(store_failure)? {
            if occupant.id != appointment_id {
                warn!(%new_slot, holder = %occupant.id, "reschedule target already booked");
                return Err(ScheduleError::SlotConflict(new_slot));
            }
        }

        let mut appointment = self
            .store
            .find_by_id(appointment_id)
            .await
            .map_err(store_failure)?
            .ok_or(ScheduleError::NotFound(appointment_id))?;

        if !requester.may_manage(&appointment) {
            warn!(%appointment_id, requester = %requester.user_id, "reschedule denied");
            return Err(ScheduleError::PermissionDenied);
        }

        if appointment.time_slot == new_slot {
            return Ok(appointment);
        }

        let old_slot = appointment.time_slot;
        appointment.time_slot = new_slot;
        let updated = self
            .store
            .update(&appointment)
            .await
            .map_err(|e| ScheduleError::from_write(e, new_slot))?
            .ok_or(ScheduleError::NotFound(appointment_id))?;
        info!(%appointment_id, from = %old_slot, to = %new_slot, "appointment rescheduled");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        requester: Requester,
    ) -> Result<(), ScheduleError> {
        let appointment = self
            .store
            .find_by_id(appointment_id)
            .await
            .map_err(store_failure)?
            .ok_or(ScheduleError::NotFound(appointment_id))?;

        if !requester.may_manage(&appointment) {
            warn!(%appointment_id, requester = %requester.user_id, "cancel denied");
            return Err(ScheduleError::PermissionDenied);
        }

        if !self.store.delete(appointment_id).await.map_err(store_failure)? {
            return Err(ScheduleError::NotFound(appointment_id));
        }
        info!(%appointment_id, slot = %appointment.time_slot, "appointment cancelled");
        Ok(())
    }

    /// The requester's own appointments; administrators see every appointment.
    #[instrument(skip(self))]
    pub async fn list_for(&self, requester: Requester) -> Result<Vec<Appointment>, ScheduleError> {
        let rows = if requester.is_admin {
            self.store.list_all().await
        } else {
            self.store.list_by_user(requester.user_id).await
        };
        rows.map_err(store_failure)
    }
}

fn store_failure(err: crate::error::StoreError) -> ScheduleError {
    error!(error = %err, "appointment store failure");
    ScheduleError::Store(err)
}
