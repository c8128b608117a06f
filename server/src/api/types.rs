//! Shared API types
//!
//! Error handling common to every endpoint. Search outcomes are not errors:
//! they travel as a `status` field in a 200 response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::filters::FilterError;
use crate::domain::results::ExportError;
use crate::domain::search::OptionsError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        match e {
            FilterError::UnknownFilter(key) => {
                Self::not_found("FILTER_NOT_FOUND", format!("Unknown filter: {}", key))
            }
            FilterError::InvalidValue { .. } => Self::bad_request("INVALID_FILTER_VALUE", e.to_string()),
            FilterError::InvalidTable(_) => {
                tracing::error!(error = %e, "Invalid table configuration");
                Self::internal("Warehouse table misconfigured")
            }
        }
    }
}

impl From<OptionsError> for ApiError {
    fn from(e: OptionsError) -> Self {
        match e {
            OptionsError::Filter(e) => e.into(),
            OptionsError::NotCategorical(_) => Self::bad_request("NO_OPTIONS", e.to_string()),
            OptionsError::Data(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Filter options unavailable");
                Self::service_unavailable("Warehouse is temporarily unavailable")
            }
            OptionsError::Data(e) => {
                tracing::error!(error = %e, "Filter options query failed");
                Self::internal("Database operation failed")
            }
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        tracing::error!(error = %e, "CSV export failed");
        Self::internal("Export failed")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
            ),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataError;

    #[test]
    fn test_filter_errors_map_to_status() {
        let unknown: ApiError = FilterError::UnknownFilter("colour".to_string()).into();
        assert_eq!(unknown.into_response().status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = FilterError::InvalidValue {
            key: "years".to_string(),
            reason: "expected an integer".to_string(),
        }
        .into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_options_errors_map_to_status() {
        let not_categorical: ApiError = OptionsError::NotCategorical("value_range".to_string()).into();
        assert_eq!(
            not_categorical.into_response().status(),
            StatusCode::BAD_REQUEST
        );

        let timeout: ApiError = OptionsError::Data(DataError::timeout("duckdb", 30)).into();
        assert_eq!(
            timeout.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let broken: ApiError =
            OptionsError::Data(DataError::InvalidQuery("bad".to_string())).into();
        assert_eq!(
            broken.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
