use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use super::{
    error::AuthError,
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::User,
};
use crate::error::{StoreError, USERNAME_KEY};

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Verifies credentials against the identity store and registers users.
/// Plaintext passwords never reach the store or the logs.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// `Ok(false)` for an unknown user or a wrong password; `Err` only when
    /// the store cannot answer.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        Ok(self.login(username, password).await?.is_some())
    }

    /// Like [`Authenticator::authenticate`] but hands back the matched user.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>, AuthError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            warn!("login for unknown username");
            return Ok(None);
        };

        let ok = verify_password(password, &user.password_hash).map_err(|e| {
            error!(user_id = %user.id, error = %e, "stored password hash unusable");
            AuthError::Store(StoreError::Corrupt(format!("password hash of user {}", user.id)))
        })?;

        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Ok(None);
        }
        Ok(Some(user))
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AuthError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(AuthError::InvalidUsername);
        }

        let hash = hash_password(password).map_err(AuthError::Hashing)?;

        let user = self
            .users
            .insert(username, &hash, is_admin)
            .await
            .map_err(|e| {
                if e.is_duplicate(USERNAME_KEY) {
                    AuthError::UsernameTaken
                } else {
                    AuthError::Store(e)
                }
            })?;
        info!(user_id = %user.id, username = %user.username, is_admin, "user registered");
        Ok(user)
    }

    /// Creates the configured administrator unless that username is live.
    /// `Ok(None)` when the name is still reserved by a deactivated account.
    pub async fn ensure_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        if let Some(existing) = self.users.find_by_username(username.trim()).await? {
            if !existing.is_admin {
                warn!(username = %existing.username, "bootstrap admin exists without admin rights");
            }
            return Ok(Some(existing));
        }
        match self.register(username, password, true).await {
            Ok(user) => Ok(Some(user)),
            Err(AuthError::UsernameTaken) => {
                warn!(
                    username = %username.trim(),
                    "bootstrap admin name belongs to a deactivated account; skipping"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Every live user, oldest first.
    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list_live().await?)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, user_id: uuid::Uuid) -> Result<bool, AuthError> {
        let removed = self.users.soft_delete(user_id).await?;
        if removed {
            info!(%user_id, "user soft-deleted");
        }
        Ok(removed)
    }
}
