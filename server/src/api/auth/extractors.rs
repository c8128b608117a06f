//! Session extractor for protected handlers

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::middleware::AuthError;

/// Search session key injected by [`super::require_auth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(AuthError::required)
    }
}
