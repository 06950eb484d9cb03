use thiserror::Error;

/// Unique constraint guarding the single-occupancy rule at the store level.
pub const APPOINTMENT_SLOT_KEY: &str = "appointments_time_slot_key";

/// Unique constraint on `users.username`.
pub const USERNAME_KEY: &str = "users_username_key";

/// Failure of an identity or appointment store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("unique constraint {0} violated")]
    Duplicate(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_duplicate(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Duplicate(c) if c == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Duplicate(constraint);
            }
        }
        StoreError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_matches_only_its_constraint() {
        let err = StoreError::Duplicate(APPOINTMENT_SLOT_KEY.into());
        assert!(err.is_duplicate(APPOINTMENT_SLOT_KEY));
        assert!(!err.is_duplicate(USERNAME_KEY));
        assert!(!StoreError::Corrupt("x".into()).is_duplicate(APPOINTMENT_SLOT_KEY));
    }

    #[test]
    fn non_database_sqlx_errors_stay_database_errors() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
