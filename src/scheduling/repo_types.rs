use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::slot::TimeSlot;

/// Appointment record in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,              // owner, by reference only
    pub time_slot: TimeSlot,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Who is asking, as resolved from the authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Requester {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Owners and administrators may modify an appointment.
    pub fn may_manage(&self, appointment: &Appointment) -> bool {
        self.is_admin || appointment.user_id == self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn appointment_of(owner: Uuid) -> Appointment {
        let now = datetime!(2024-03-05 08:00 UTC);
        Appointment {
            id: Uuid::new_v4(),
            user_id: owner,
            time_slot: TimeSlot::new(datetime!(2024-03-05 09:00 UTC)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn owner_and_admin_may_manage() {
        let owner = Uuid::new_v4();
        let appt = appointment_of(owner);
        assert!(Requester::user(owner).may_manage(&appt));
        assert!(Requester::admin(Uuid::new_v4()).may_manage(&appt));
        assert!(!Requester::user(Uuid::new_v4()).may_manage(&appt));
    }
}
