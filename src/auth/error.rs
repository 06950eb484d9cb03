use thiserror::Error;

use super::password::PasswordError;
use crate::error::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username must be 1-64 characters of letters, digits, '.', '_' or '-'")]
    InvalidUsername,
    #[error("username already registered")]
    UsernameTaken,
    #[error("password hashing failed: {0}")]
    Hashing(#[source] PasswordError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
