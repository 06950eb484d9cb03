use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        error::AuthError,
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::User,
    },
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).delete(delete_me))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let user = state
        .authenticator
        .register(&payload.username, &payload.password, false)
        .await
        .map_err(auth_error)?;

    let response = issue_tokens(&state, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = state
        .authenticator
        .login(&payload.username, &payload.password)
        .await
        .map_err(auth_error)?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = load_live_user(&state, claims.sub).await?;
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = load_live_user(&state, requester.user_id).await?;
    Ok(Json(user.into()))
}

/// Soft-deletes the caller's account; their appointments stay in place.
#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> Result<StatusCode, (StatusCode, String)> {
    if !state
        .authenticator
        .deactivate(requester.user_id)
        .await
        .map_err(auth_error)?
    {
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Admin-only directory of live accounts.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> Result<Json<Vec<PublicUser>>, (StatusCode, String)> {
    if !requester.is_admin {
        warn!(user_id = %requester.user_id, "user listing refused");
        return Err((StatusCode::FORBIDDEN, "Admin rights required".into()));
    }
    let users = state.authenticator.list_users().await.map_err(auth_error)?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

async fn load_live_user(state: &AppState, user_id: Uuid) -> Result<User, (StatusCode, String)> {
    match state.users.find_by_id(user_id).await {
        Ok(Some(u)) => Ok(u),
        Ok(None) => Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) => Err(auth_error(e.into())),
    }
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let sign = |token: anyhow::Result<String>| {
        token.map_err(|e| {
            error!(error = %e, "jwt sign failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Token signing failed".to_string())
        })
    };
    let access_token = sign(keys.sign_access(user.id))?;
    let refresh_token = sign(keys.sign_refresh(user.id))?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

pub(crate) fn auth_error(e: AuthError) -> (StatusCode, String) {
    match e {
        AuthError::InvalidUsername => (StatusCode::BAD_REQUEST, e.to_string()),
        AuthError::UsernameTaken => (StatusCode::CONFLICT, "Username already registered".into()),
        AuthError::Hashing(ref source) => {
            error!(error = %source, "hash_password failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not process password".into())
        }
        AuthError::Store(ref source) => {
            error!(error = %source, "identity store failure");
            (StatusCode::SERVICE_UNAVAILABLE, "Identity store unavailable".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::app::build_app;

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_public_user_serialization() {
        let response = PublicUser {
            id: Uuid::new_v4(),
            username: "tester".to_string(),
            is_admin: false,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("tester"));
        assert!(json.contains("id"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(auth_error(AuthError::InvalidUsername).0, StatusCode::BAD_REQUEST);
        assert_eq!(auth_error(AuthError::UsernameTaken).0, StatusCode::CONFLICT);
        assert_eq!(
            auth_error(AuthError::Hashing(crate::auth::password::PasswordError::TooLong)).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn register_login_me_and_delete() {
        let app = build_app(AppState::fake());

        let res = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/register",
                json!({ "username": "newuser", "password": "securepassword" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({ "username": "newuser", "password": "wrongpassword" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({ "username": "newuser", "password": "securepassword" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        let token = body["access_token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["username"], "newuser");

        let me = |method: &str| {
            Request::builder()
                .method(method)
                .uri("/api/v1/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let res = app.clone().oneshot(me("GET")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["is_admin"], false);

        let res = app.clone().oneshot(me("DELETE")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        // the token outlives the account but no longer resolves to a user
        let res = app.oneshot(me("GET")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    fn with_token(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn token_for(state: &AppState, name: &str, admin: bool) -> (Uuid, String) {
        let user = state
            .authenticator
            .register(name, "securepassword", admin)
            .await
            .unwrap();
        (user.id, JwtKeys::from_ref(state).sign_access(user.id).unwrap())
    }

    #[tokio::test]
    async fn deleted_account_keeps_its_appointments() {
        let state = AppState::fake();
        let (alice_id, alice) = token_for(&state, "alice", false).await;
        let (_, admin) = token_for(&state, "root", true).await;
        let app = build_app(state.clone());

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/appointments")
                    .header(header::AUTHORIZATION, format!("Bearer {alice}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "time_slot": "2030-01-02 09:00" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let id = json_body(res).await["id"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(with_token("DELETE", "/api/v1/me", &alice))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = app
            .clone()
            .oneshot(with_token("GET", "/api/v1/appointments", &admin))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let rows = json_body(res).await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["id"], id.as_str());
        assert_eq!(rows[0]["user_id"], alice_id.to_string());

        let res = app
            .oneshot(with_token("DELETE", &format!("/api/v1/appointments/{id}"), &admin))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(state.appointments.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_listing_is_admin_only() {
        let state = AppState::fake();
        let (_, alice) = token_for(&state, "alice", false).await;
        let (gone_id, _) = token_for(&state, "gone", false).await;
        let (_, admin) = token_for(&state, "root", true).await;
        state.authenticator.deactivate(gone_id).await.unwrap();
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(with_token("GET", "/api/v1/users", &alice))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .oneshot(with_token("GET", "/api/v1/users", &admin))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        let mut names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["username"].as_str().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["alice", "root"]);
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn short_password_and_duplicate_username() {
        let app = build_app(AppState::fake());

        let res = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/register",
                json!({ "username": "frank", "password": "short" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = json!({ "username": "frank", "password": "securepassword" });
        let res = app
            .clone()
            .oneshot(post_json("/api/v1/auth/register", body.clone()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let res = app
            .oneshot(post_json("/api/v1/auth/register", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
