//! Filter API endpoints
//!
//! Filter values live in the caller's search session. Setting a value only
//! validates and stores it; nothing is executed until a search is run.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::DashboardState;
use crate::api::auth::SessionId;
use crate::api::extractors::{FilterPath, ValidatedJson};
use crate::api::types::ApiError;
use crate::domain::filters::{
    FilterInput, FilterKind, FilterSpec, FilterState, FilterValue, ScalarType, SqlValue,
};

/// Maximum number of values accepted for one selection
const MAX_SELECTION: u64 = 1_000;

/// Maximum length of comma-separated filter text
const MAX_TEXT_LEN: u64 = 20_000;

#[derive(Debug, Serialize, ToSchema)]
pub struct FilterDto {
    pub key: String,
    pub label: String,
    pub kind: FilterKind,
    pub value_type: ScalarType,
    /// Drill-down axis, e.g. `uktzed` for group → position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub active: bool,
    pub value: FilterValue,
}

impl FilterDto {
    fn new(spec: &FilterSpec, value: &FilterValue) -> Self {
        Self {
            key: spec.key.to_string(),
            label: spec.label.to_string(),
            kind: spec.kind,
            value_type: spec.value_type,
            axis: spec.hierarchy.map(|h| h.axis.to_string()),
            level: spec.hierarchy.map(|h| h.level),
            active: value.is_active(),
            value: value.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FiltersResponse {
    pub filters: Vec<FilterDto>,
    pub any_active: bool,
}

impl FiltersResponse {
    fn from_state(state: &FilterState) -> Self {
        Self {
            filters: state
                .entries()
                .map(|(spec, value)| FilterDto::new(spec, value))
                .collect(),
            any_active: state.any_active(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilterOptionsResponse {
    pub key: String,
    pub values: Vec<SqlValue>,
}

/// New value for a filter; which field is read depends on the filter kind
///
/// Categorical filters take `values`, ranges take `from`/`to` (null, zero
/// or negative bounds are unset), text lists take comma-separated `text`.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct SetFilterRequest {
    #[validate(length(max = MAX_SELECTION, message = "Too many values for one filter"))]
    pub values: Option<Vec<SqlValue>>,
    pub from: Option<f64>,
    pub to: Option<f64>,
    #[validate(length(max = MAX_TEXT_LEN, message = "Filter text is too long"))]
    pub text: Option<String>,
}

impl SetFilterRequest {
    fn into_input(self, spec: &FilterSpec) -> Result<FilterInput, ApiError> {
        match spec.kind {
            kind if kind.is_categorical() => self
                .values
                .map(FilterInput::Selection)
                .ok_or_else(|| missing_field(spec, "values")),
            FilterKind::NumericRange => Ok(FilterInput::Range {
                from: self.from,
                to: self.to,
            }),
            _ => self
                .text
                .map(FilterInput::Text)
                .ok_or_else(|| missing_field(spec, "text")),
        }
    }
}

fn missing_field(spec: &FilterSpec, field: &str) -> ApiError {
    ApiError::bad_request(
        "INVALID_FILTER_VALUE",
        format!("Filter '{}' expects a '{}' field", spec.key, field),
    )
}

pub fn routes(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(list_filters))
        .route("/reset", post(reset_all_filters))
        .route("/{key}", put(set_filter).delete(reset_filter))
        .route("/{key}/options", get(filter_options))
        .with_state(state)
}

/// Catalog with the session's current values
#[utoipa::path(
    get,
    path = "/api/v1/filters",
    tag = "filters",
    responses(
        (status = 200, description = "Filters and their values", body = FiltersResponse),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn list_filters(
    State(state): State<DashboardState>,
    session_id: SessionId,
) -> Json<FiltersResponse> {
    let session = state.session(&session_id);
    let session = session.lock();
    Json(FiltersResponse::from_state(&session.filters))
}

/// Distinct values for a categorical filter
#[utoipa::path(
    get,
    path = "/api/v1/filters/{key}/options",
    tag = "filters",
    params(("key" = String, Path, description = "Filter key")),
    responses(
        (status = 200, description = "Option list", body = FilterOptionsResponse),
        (status = 400, description = "Filter has no option list"),
        (status = 404, description = "Unknown filter"),
        (status = 503, description = "Warehouse unavailable")
    )
)]
pub async fn filter_options(
    State(state): State<DashboardState>,
    FilterPath { spec }: FilterPath,
) -> Result<(HeaderMap, Json<FilterOptionsResponse>), ApiError> {
    let values = state.search.options(spec.key).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=30"),
    );
    Ok((
        headers,
        Json(FilterOptionsResponse {
            key: spec.key.to_string(),
            values,
        }),
    ))
}

/// Validate and store a filter value
#[utoipa::path(
    put,
    path = "/api/v1/filters/{key}",
    tag = "filters",
    params(("key" = String, Path, description = "Filter key")),
    request_body = SetFilterRequest,
    responses(
        (status = 200, description = "Stored value", body = FilterDto),
        (status = 400, description = "Value does not fit the filter"),
        (status = 404, description = "Unknown filter")
    )
)]
pub async fn set_filter(
    State(state): State<DashboardState>,
    session_id: SessionId,
    FilterPath { spec }: FilterPath,
    ValidatedJson(request): ValidatedJson<SetFilterRequest>,
) -> Result<Json<FilterDto>, ApiError> {
    let input = request.into_input(spec)?;

    let session = state.session(&session_id);
    let mut session = session.lock();
    session.filters.set_value(spec.key, input)?;
    let value = session.filters.value(spec.key)?;

    tracing::debug!(filter = spec.key, active = value.is_active(), "Filter set");
    Ok(Json(FilterDto::new(spec, value)))
}

/// Return one filter to its inactive default
#[utoipa::path(
    delete,
    path = "/api/v1/filters/{key}",
    tag = "filters",
    params(("key" = String, Path, description = "Filter key")),
    responses(
        (status = 200, description = "Filter reset", body = FilterDto),
        (status = 404, description = "Unknown filter")
    )
)]
pub async fn reset_filter(
    State(state): State<DashboardState>,
    session_id: SessionId,
    FilterPath { spec }: FilterPath,
) -> Result<Json<FilterDto>, ApiError> {
    let session = state.session(&session_id);
    let mut session = session.lock();
    session.filters.reset(spec.key)?;
    Ok(Json(FilterDto::new(spec, session.filters.value(spec.key)?)))
}

/// Reset every filter and drop the stored results
#[utoipa::path(
    post,
    path = "/api/v1/filters/reset",
    tag = "filters",
    responses(
        (status = 200, description = "All filters reset", body = FiltersResponse)
    )
)]
pub async fn reset_all_filters(
    State(state): State<DashboardState>,
    session_id: SessionId,
) -> Json<FiltersResponse> {
    let session = state.session(&session_id);
    let mut session = session.lock();
    session.reset_all();
    tracing::debug!("All filters reset");
    Json(FiltersResponse::from_state(&session.filters))
}
