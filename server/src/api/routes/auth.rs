//! Authentication API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::{AuthManager, LoginError};
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::core::constants::{DEFAULT_SESSION_TTL_HOURS, SESSION_COOKIE_NAME};
use crate::domain::SessionStore;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 256, message = "Password must be 1-256 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub auth_enabled: bool,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AuthRoutesState {
    pub auth_manager: Arc<AuthManager>,
    pub sessions: SessionStore,
}

/// Status and logout; login is built separately so it can be rate limited on its own
pub fn routes(auth_manager: Arc<AuthManager>, sessions: SessionStore) -> Router {
    Router::new()
        .route("/status", get(auth_status))
        .route("/logout", post(logout))
        .with_state(AuthRoutesState {
            auth_manager,
            sessions,
        })
}

pub fn login_routes(auth_manager: Arc<AuthManager>, sessions: SessionStore) -> Router {
    Router::new()
        .route("/login", post(login))
        .with_state(AuthRoutesState {
            auth_manager,
            sessions,
        })
}

fn session_cookie(value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/api")
        .max_age(max_age)
        .build()
}

/// Exchange the dashboard password for a session cookie
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Wrong password"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let (jwt, claims) = state
        .auth_manager
        .login(&request.password)
        .map_err(|e| match e {
            LoginError::InvalidPassword => {
                tracing::debug!("Login rejected");
                ApiError::unauthorized("INVALID_PASSWORD", "Invalid password")
            }
            LoginError::Token(reason) => {
                tracing::error!(%reason, "Failed to issue session token");
                ApiError::internal("Failed to create session")
            }
        })?;

    // Fresh search session for the new token
    state.sessions.get_or_create(&claims.jti);

    let cookie = session_cookie(jwt, time::Duration::hours(DEFAULT_SESSION_TTL_HOURS));
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            expires_at: DateTime::from_timestamp(claims.exp, 0),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/status",
    tag = "auth",
    responses(
        (status = 200, description = "Authentication status", body = AuthStatusResponse)
    )
)]
pub async fn auth_status(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
) -> Json<AuthStatusResponse> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    if !state.auth_manager.is_enabled() {
        return Json(AuthStatusResponse {
            authenticated: true,
            auth_enabled: false,
            version: VERSION,
            expires_at: None,
        });
    }

    let claims = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| state.auth_manager.validate_session(cookie.value()).ok());

    Json(AuthStatusResponse {
        authenticated: claims.is_some(),
        auth_enabled: true,
        version: VERSION,
        expires_at: claims.and_then(|c| DateTime::from_timestamp(c.exp, 0)),
    })
}

/// Clear the session cookie and drop the search session behind it
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out successfully")
    )
)]
pub async fn logout(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME)
        && let Ok(claims) = state.auth_manager.validate_session(cookie.value())
    {
        state.sessions.remove(&claims.jti);
    }

    let cookie = session_cookie(String::new(), time::Duration::seconds(0));
    (
        jar.remove(cookie),
        Json(serde_json::json!({
            "success": true,
            "message": "Logged out successfully"
        })),
    )
}
