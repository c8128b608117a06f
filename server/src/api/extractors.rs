//! Path and validation extractors for API routes
//!
//! ## HTTP Caching Strategy
//!
//! | Endpoint Type           | Cache-Control          |
//! |-------------------------|------------------------|
//! | Filter options          | `private, max-age=30`  |
//! | Session state, results  | `no-store`             |
//! | CSV export              | `no-store`             |

use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::domain::filters::{FilterSpec, find};

/// Raw path extractor for filter routes (internal use)
#[derive(Debug, Deserialize)]
struct FilterPathRaw {
    key: String,
}

/// Filter path extractor.
///
/// Resolves `{key}` against the filter catalog. Unknown keys are rejected
/// with 404 before the handler runs.
#[derive(Debug)]
pub struct FilterPath {
    pub spec: &'static FilterSpec,
}

impl<S> FromRequestParts<S> for FilterPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<FilterPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        let spec = find(&raw.key).ok_or(ValidationRejection::UnknownFilter(raw.key))?;
        Ok(Self { spec })
    }
}

/// Validation rejection with structured error response
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Filter key not in the catalog
    UnknownFilter(String),
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let (status, error, code, message) = match self {
            Self::Path(rejection) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "PATH_PARSE_ERROR",
                rejection.body_text(),
            ),
            Self::UnknownFilter(key) => (
                StatusCode::NOT_FOUND,
                "not_found",
                "FILTER_NOT_FOUND",
                format!("Unknown filter: {}", key),
            ),
            Self::Json(rejection) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "JSON_PARSE_ERROR",
                rejection.body_text(),
            ),
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "VALIDATION_ERROR",
                format_validation_errors(&errors),
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// JSON body extractor with automatic validation.
///
/// Deserializes JSON body and validates it using the `validator` crate.
/// Returns a `ValidationRejection` on parse or validation failure.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}
