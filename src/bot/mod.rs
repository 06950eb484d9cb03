//! Chat-style command front end: one line of text in, one line of reply out.

pub mod commands;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::{error, info, instrument};

use crate::{
    auth::extractors::AuthUser,
    scheduling::{
        error::ScheduleError, repo_types::Requester, services::Scheduler, slot::TimeSlot,
    },
    state::AppState,
};
use commands::{Command, HELP};

#[derive(Debug, Deserialize)]
pub struct BotMessage {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct BotReply {
    pub reply: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/bot", post(bot_message))
}

#[instrument(skip(state, message))]
pub async fn bot_message(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Json(message): Json<BotMessage>,
) -> Json<BotReply> {
    let today = OffsetDateTime::now_utc().date();
    let reply = handle(&state.scheduler, requester, &message.text, today).await;
    Json(BotReply { reply })
}

/// Runs one command. Parse failures are answered here and never reach the
/// scheduler.
pub async fn handle(
    scheduler: &Scheduler,
    requester: Requester,
    text: &str,
    today: Date,
) -> String {
    let command = match Command::parse(text) {
        Ok(c) => c,
        Err(e) => return e.to_string(),
    };
    info!(user_id = %requester.user_id, ?command, "bot command");

    match command {
        Command::Book { slot } => {
            let slot = match TimeSlot::parse(&slot, today) {
                Ok(s) => s,
                Err(e) => return format!("Invalid time format: {e}"),
            };
            match scheduler.book(requester.user_id, slot).await {
                Ok(a) => format!(
                    "Appointment booked successfully at {} (id {})",
                    a.time_slot, a.id
                ),
                Err(e) => failure("book appointment", e),
            }
        }
        Command::Reschedule { id, slot } => {
            let slot = match TimeSlot::parse(&slot, today) {
                Ok(s) => s,
                Err(e) => return format!("Invalid time format: {e}"),
            };
            match scheduler.reschedule(id, slot, requester).await {
                Ok(a) => format!("Appointment {} moved to {}", a.id, a.time_slot),
                Err(e) => failure("reschedule appointment", e),
            }
        }
        Command::Cancel { id } => match scheduler.cancel(id, requester).await {
            Ok(()) => format!("Appointment {id} cancelled"),
            Err(e) => failure("cancel appointment", e),
        },
        Command::List => match scheduler.list_for(requester).await {
            Ok(rows) if rows.is_empty() => "No appointments".to_string(),
            Ok(rows) => rows
                .iter()
                .map(|a| format!("{} {}", a.time_slot, a.id))
                .collect::<Vec<_>>()
                .join("; "),
            Err(e) => failure("list appointments", e),
        },
        Command::Help => HELP.to_string(),
    }
}

/// Store failures are logged and answered generically.
fn failure(action: &str, e: ScheduleError) -> String {
    match e {
        ScheduleError::Store(ref source) => {
            error!(error = %source, action, "scheduling store failure");
            format!("Failed to {action}: scheduling is temporarily unavailable")
        }
        other => format!("Failed to {action}: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use time::macros::date;
    use uuid::Uuid;

    use super::*;
    use crate::{
        error::StoreError,
        memory::MemoryAppointmentStore,
        scheduling::{repo::AppointmentStore, repo_types::Appointment},
    };

    const TODAY: Date = date!(2024 - 03 - 05);

    fn scheduler() -> Scheduler {
        Scheduler::new(Arc::new(MemoryAppointmentStore::default()))
    }

    fn id_in(reply: &str) -> Uuid {
        let start = reply.find("(id ").unwrap() + 4;
        Uuid::parse_str(&reply[start..start + 36]).unwrap()
    }

    #[tokio::test]
    async fn book_conflict_reschedule_scenario() {
        let scheduler = scheduler();
        let user1 = Requester::user(Uuid::new_v4());
        let user2 = Requester::user(Uuid::new_v4());

        let reply = handle(&scheduler, user1, "/book 09:00", TODAY).await;
        assert!(reply.starts_with("Appointment booked successfully at 2024-03-05 09:00 UTC"));
        let appt1 = id_in(&reply);

        let reply = handle(&scheduler, user2, "/book 09:00", TODAY).await;
        assert!(reply.starts_with("Failed to book appointment"), "{reply}");
        assert!(reply.contains("already booked"));

        let reply = handle(&scheduler, user1, &format!("/reschedule {appt1} 10:00"), TODAY).await;
        assert_eq!(reply, format!("Appointment {appt1} moved to 2024-03-05 10:00 UTC"));

        let reply = handle(&scheduler, user2, "/book 09:00", TODAY).await;
        assert!(reply.starts_with("Appointment booked successfully"), "{reply}");
    }

    #[tokio::test]
    async fn invalid_time_is_reported_without_booking() {
        let scheduler = scheduler();
        let user = Requester::user(Uuid::new_v4());

        let reply = handle(&scheduler, user, "/book 9 o'clock", TODAY).await;
        assert!(reply.starts_with("Invalid time format"));
        assert_eq!(handle(&scheduler, user, "/list", TODAY).await, "No appointments");
    }

    #[tokio::test]
    async fn stranger_cannot_cancel() {
        let scheduler = scheduler();
        let owner = Requester::user(Uuid::new_v4());
        let id = id_in(&handle(&scheduler, owner, "/book 11:00", TODAY).await);

        let command = format!("/cancel {id}");
        let stranger = Requester::user(Uuid::new_v4());
        let reply = handle(&scheduler, stranger, &command, TODAY).await;
        assert!(reply.contains("permission denied"), "{reply}");

        let admin = Requester::admin(Uuid::new_v4());
        let reply = handle(&scheduler, admin, &command, TODAY).await;
        assert_eq!(reply, format!("Appointment {id} cancelled"));
    }

    #[tokio::test]
    async fn help_and_unknown() {
        let scheduler = scheduler();
        let user = Requester::user(Uuid::new_v4());
        assert_eq!(handle(&scheduler, user, "/help", TODAY).await, HELP);
        assert!(handle(&scheduler, user, "/dance", TODAY).await.starts_with("unknown command"));
    }

    /// Every call fails with a store error carrying connection details.
    struct LeakyStore;

    fn leak() -> StoreError {
        StoreError::Corrupt("host=db.internal password=hunter2".into())
    }

    #[async_trait]
    impl AppointmentStore for LeakyStore {
        async fn find_by_slot(&self, _: TimeSlot) -> Result<Option<Appointment>, StoreError> {
            Err(leak())
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<Appointment>, StoreError> {
            Err(leak())
        }
        async fn insert(&self, _: Uuid, _: TimeSlot) -> Result<Appointment, StoreError> {
            Err(leak())
        }
        async fn update(&self, _: &Appointment) -> Result<Option<Appointment>, StoreError> {
            Err(leak())
        }
        async fn delete(&self, _: Uuid) -> Result<bool, StoreError> {
            Err(leak())
        }
        async fn list_by_user(&self, _: Uuid) -> Result<Vec<Appointment>, StoreError> {
            Err(leak())
        }
        async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
            Err(leak())
        }
    }

    #[tokio::test]
    async fn store_failures_do_not_reach_the_reply() {
        let scheduler = Scheduler::new(Arc::new(LeakyStore));
        let user = Requester::user(Uuid::new_v4());
        let id = Uuid::new_v4();

        for (text, prefix) in [
            ("/book 09:00".to_string(), "Failed to book appointment"),
            (format!("/reschedule {id} 10:00"), "Failed to reschedule appointment"),
            (format!("/cancel {id}"), "Failed to cancel appointment"),
            ("/list".to_string(), "Failed to list appointments"),
        ] {
            let reply = handle(&scheduler, user, &text, TODAY).await;
            assert!(reply.starts_with(prefix), "{reply}");
            assert!(reply.contains("temporarily unavailable"), "{reply}");
            assert!(!reply.contains("hunter2"), "{reply}");
            assert!(!reply.contains("db.internal"), "{reply}");
        }
    }
}
