use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::{error, warn};

use super::jwt::JwtKeys;
use crate::{scheduling::repo_types::Requester, state::AppState};

/// Validates the bearer access token and resolves the live user behind it.
pub struct AuthUser(pub Requester);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let claims = JwtKeys::from_ref(state).verify_access(token).map_err(|_| {
            warn!("invalid or expired token");
            (StatusCode::UNAUTHORIZED, "invalid or expired token".into())
        })?;

        // admin flag and soft-deletion are read fresh on every request
        let user = match state.users.find_by_id(claims.sub).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(user_id = %claims.sub, "token for unknown or deleted user");
                return Err((StatusCode::UNAUTHORIZED, "user not found".into()));
            }
            Err(e) => {
                error!(error = %e, "user lookup failed");
                return Err((
                    StatusCode::SERVICE_UNAVAILABLE,
                    "identity store unavailable".into(),
                ));
            }
        };

        Ok(AuthUser(Requester {
            user_id: user.id,
            is_admin: user.is_admin,
        }))
    }
}
