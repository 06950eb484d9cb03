use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use time::{
    format_description::FormatItem, macros::format_description, Date, Duration, OffsetDateTime,
    PrimitiveDateTime, Time, UtcOffset,
};

const CLOCK: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const DATE_CLOCK: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");
const DISPLAY: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute] UTC");

/// A bookable point in time, held in UTC at minute precision.
///
/// Two slots conflict exactly when they are equal; there is no tolerance
/// window and no duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct TimeSlot(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time slot {0:?}: expected HH:MM or YYYY-MM-DD HH:MM")]
pub struct SlotParseError(pub String);

impl TimeSlot {
    /// Normalizes to UTC and drops seconds and sub-second precision.
    pub fn new(at: OffsetDateTime) -> Self {
        let at = at.to_offset(UtcOffset::UTC);
        let at = at
            - Duration::seconds(i64::from(at.second()))
            - Duration::nanoseconds(i64::from(at.nanosecond()));
        Self(at)
    }

    pub fn on(date: Date, time: Time) -> Self {
        Self::new(PrimitiveDateTime::new(date, time).assume_utc())
    }

    /// Parses operator input. A bare `HH:MM` is placed on `today`.
    pub fn parse(text: &str, today: Date) -> Result<Self, SlotParseError> {
        let text = text.trim();
        if let Ok(clock) = Time::parse(text, CLOCK) {
            return Ok(Self::on(today, clock));
        }
        PrimitiveDateTime::parse(text, DATE_CLOCK)
            .map(|at| Self::new(at.assume_utc()))
            .map_err(|_| SlotParseError(text.to_string()))
    }

    pub fn as_datetime(&self) -> OffsetDateTime {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        time::serde::rfc3339::deserialize(deserializer).map(Self::new)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(DISPLAY) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}
