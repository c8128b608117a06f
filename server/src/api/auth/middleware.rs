//! Authentication middleware

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::extractors::SessionId;
use super::jwt::JwtError;
use super::manager::AuthManager;
use crate::api::middleware::AllowedOrigins;
use crate::core::constants::{LOCAL_SESSION_ID, SESSION_COOKIE_NAME};

/// Authentication error response
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl AuthError {
    pub fn required() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "AUTH_REQUIRED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn expired() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_EXPIRED",
            message: "Session has expired".to_string(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_INVALID",
            message: "Invalid session token".to_string(),
        }
    }

    pub fn origin_not_allowed() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: "forbidden",
            code: "ORIGIN_NOT_ALLOWED",
            message: "Request origin not allowed".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error,
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub auth_manager: Arc<AuthManager>,
    pub allowed_origins: AllowedOrigins,
}

/// Origin of the request, falling back to the Referer's scheme, host and port
fn request_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        return Some(origin.to_string());
    }

    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    match reqwest::Url::parse(referer) {
        Ok(u) => {
            let Some(host) = u.host_str() else {
                tracing::warn!(referer = %referer, "Referer URL has no host");
                return None;
            };
            Some(match u.port() {
                Some(port) => format!("{}://{}:{}", u.scheme(), host, port),
                None => format!("{}://{}", u.scheme(), host),
            })
        }
        Err(_) => {
            tracing::debug!(referer = %referer, "Failed to parse Referer URL");
            None
        }
    }
}

/// Require a valid session cookie and inject the [`SessionId`]
///
/// With auth disabled every request shares the local session.
pub async fn require_auth(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.auth_manager.is_enabled() {
        request
            .extensions_mut()
            .insert(SessionId(LOCAL_SESSION_ID.to_string()));
        return Ok(next.run(request).await);
    }

    if let Some(origin) = request_origin(request.headers())
        && !state.allowed_origins.is_allowed(&origin)
    {
        tracing::warn!(%origin, "Rejected request from disallowed origin");
        return Err(AuthError::origin_not_allowed());
    }

    let session_cookie = jar
        .get(SESSION_COOKIE_NAME)
        .ok_or_else(AuthError::required)?;

    let claims = state
        .auth_manager
        .validate_session(session_cookie.value())
        .map_err(|e| match e {
            JwtError::Expired => AuthError::expired(),
            _ => AuthError::invalid(),
        })?;

    request.extensions_mut().insert(SessionId(claims.jti));
    Ok(next.run(request).await)
}
