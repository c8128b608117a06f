//! Search API endpoints

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::DashboardState;
use crate::api::auth::SessionId;
use crate::api::types::ApiError;
use crate::domain::filters::{BoundParam, CompiledQuery, SearchPlan};
use crate::domain::results::{DisplayTable, ResultTable, Summary};
use crate::domain::session::{ResultOrigin, SharedSession};
use crate::domain::{SearchOutcome, SearchStatus};

/// Processed result of a search or question
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unusable model output, shown so the user can rephrase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub table: DisplayTable,
    pub summary: Summary,
}

impl SearchResponse {
    fn new(outcome: &SearchOutcome) -> Self {
        Self {
            status: outcome.status,
            message: outcome.message.clone(),
            raw: outcome.raw.clone(),
            sql: outcome.sql.clone(),
            table: outcome.table.display(),
            summary: outcome.table.summary(),
        }
    }

    fn superseded() -> Self {
        let table = ResultTable::default();
        Self {
            status: SearchStatus::Superseded,
            message: Some("Filters changed while the search was running".to_string()),
            raw: None,
            sql: None,
            table: table.display(),
            summary: table.summary(),
        }
    }
}

/// Build the response and keep the table as the session's current results
///
/// `generation` is the filter generation captured before the run started.
/// If the filters changed since then the outcome is dropped and the session
/// is left as the change made it. Anything but a successful run clears the
/// stored results so that an old table is never shown next to a failed search.
pub(crate) fn record_outcome(
    session: &SharedSession,
    origin: ResultOrigin,
    generation: u64,
    outcome: SearchOutcome,
) -> SearchResponse {
    let mut session = session.lock();
    if session.filters.generation() != generation {
        tracing::debug!(?origin, "Filters changed during the run, outcome dropped");
        return SearchResponse::superseded();
    }

    let response = SearchResponse::new(&outcome);
    if outcome.is_ok() {
        session.store_results(origin, outcome.table);
    } else {
        session.clear_results();
    }
    response
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryPreviewResponse {
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub params: Vec<BoundParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoredResultsResponse {
    pub origin: ResultOrigin,
    pub stored_at: DateTime<Utc>,
    pub table: DisplayTable,
    pub summary: Summary,
}

pub fn routes(state: DashboardState) -> Router {
    Router::new()
        .route("/", post(run_search))
        .route("/query", get(preview_query))
        .route("/results", get(stored_results))
        .route("/export", get(export_results))
        .with_state(state)
}

/// Compiled statement for the current filters, without running it
#[utoipa::path(
    get,
    path = "/api/v1/search/query",
    tag = "search",
    responses(
        (status = 200, description = "Compiled query or nothing_to_search", body = QueryPreviewResponse)
    )
)]
pub async fn preview_query(
    State(state): State<DashboardState>,
    session_id: SessionId,
) -> Json<QueryPreviewResponse> {
    let filters = state.session(&session_id).lock().filters.clone();

    Json(match state.search.preview(&filters) {
        SearchPlan::Query(CompiledQuery { sql, params, limit }) => QueryPreviewResponse {
            status: SearchStatus::Ok,
            sql: Some(sql),
            params,
            limit: Some(limit),
        },
        SearchPlan::NothingToSearch => QueryPreviewResponse {
            status: SearchStatus::NothingToSearch,
            sql: None,
            params: Vec::new(),
            limit: None,
        },
    })
}

/// Compile the session's filters, execute and store the results
#[utoipa::path(
    post,
    path = "/api/v1/search",
    tag = "search",
    responses(
        (status = 200, description = "Search outcome; failures are reported in `status`", body = SearchResponse)
    )
)]
pub async fn run_search(
    State(state): State<DashboardState>,
    session_id: SessionId,
) -> Json<SearchResponse> {
    let session = state.session(&session_id);
    let filters = session.lock().filters.clone();

    let outcome = state.search.run(&filters).await;
    tracing::debug!(status = ?outcome.status, rows = outcome.table.len(), "Search finished");
    Json(record_outcome(
        &session,
        ResultOrigin::Filters,
        filters.generation(),
        outcome,
    ))
}

/// Last stored results of the session
#[utoipa::path(
    get,
    path = "/api/v1/search/results",
    tag = "search",
    responses(
        (status = 200, description = "Stored results", body = StoredResultsResponse),
        (status = 404, description = "No results stored")
    )
)]
pub async fn stored_results(
    State(state): State<DashboardState>,
    session_id: SessionId,
) -> Result<(HeaderMap, Json<StoredResultsResponse>), ApiError> {
    let session = state.session(&session_id);
    let session = session.lock();
    let stored = session.results().ok_or_else(no_results)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((
        headers,
        Json(StoredResultsResponse {
            origin: stored.origin,
            stored_at: stored.stored_at,
            table: stored.table.display(),
            summary: stored.table.summary(),
        }),
    ))
}

/// Download the stored results as CSV
#[utoipa::path(
    get,
    path = "/api/v1/search/export",
    tag = "search",
    responses(
        (status = 200, description = "UTF-8 CSV with display headers", content_type = "text/csv"),
        (status = 404, description = "No results stored")
    )
)]
pub async fn export_results(
    State(state): State<DashboardState>,
    session_id: SessionId,
) -> Result<Response, ApiError> {
    let (bytes, stored_at) = {
        let session = state.session(&session_id);
        let session = session.lock();
        let stored = session.results().ok_or_else(no_results)?;
        (stored.table.export_csv()?, stored.stored_at)
    };

    let filename = format!("declarations-{}.csv", stored_at.format("%Y%m%d-%H%M%S"));
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Ok(disposition) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    tracing::debug!(bytes = bytes.len(), "Results exported");
    Ok((headers, Body::from(bytes)).into_response())
}

fn no_results() -> ApiError {
    ApiError::not_found("NO_RESULTS", "No search results to show yet")
}
