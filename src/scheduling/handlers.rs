use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    routing::{get, patch},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{AppointmentResponse, BookRequest, RescheduleRequest},
    error::ScheduleError,
    slot::TimeSlot,
};
use crate::{auth::extractors::AuthUser, state::AppState};

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(book))
        .route("/appointments/:id", patch(reschedule).delete(cancel))
}

#[instrument(skip(state))]
pub async fn list_appointments(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> Result<Json<Vec<AppointmentResponse>>, (StatusCode, String)> {
    let rows = state
        .scheduler
        .list_for(requester)
        .await
        .map_err(schedule_error)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn book(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Json(payload): Json<BookRequest>,
) -> Result<
    (StatusCode, [(header::HeaderName, String); 1], Json<AppointmentResponse>),
    (StatusCode, String),
> {
    let slot = parse_slot(&payload.time_slot)?;
    let appointment = state
        .scheduler
        .book(requester.user_id, slot)
        .await
        .map_err(schedule_error)?;
    let location = format!("/api/v1/appointments/{}", appointment.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(appointment.into()),
    ))
}

#[instrument(skip(state, payload))]
pub async fn reschedule(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleRequest>,
) -> Result<Json<AppointmentResponse>, (StatusCode, String)> {
    let slot = parse_slot(&payload.time_slot)?;
    let appointment = state
        .scheduler
        .reschedule(id, slot, requester)
        .await
        .map_err(schedule_error)?;
    Ok(Json(appointment.into()))
}

#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .scheduler
        .cancel(id, requester)
        .await
        .map_err(schedule_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_slot(text: &str) -> Result<TimeSlot, (StatusCode, String)> {
    TimeSlot::parse(text, OffsetDateTime::now_utc().date()).map_err(|e| {
        warn!(error = %e, "invalid time slot");
        (StatusCode::BAD_REQUEST, e.to_string())
    })
}

pub(crate) fn schedule_error(e: ScheduleError) -> (StatusCode, String) {
    let status = match &e {
        ScheduleError::SlotConflict(_) => StatusCode::CONFLICT,
        ScheduleError::NotFound(_) => StatusCode::NOT_FOUND,
        ScheduleError::PermissionDenied => StatusCode::FORBIDDEN,
        ScheduleError::Store(_) => {
            error!(error = %e, "scheduling store failure");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Scheduling is temporarily unavailable".into(),
            );
        }
    };
    (status, e.to_string())
}
