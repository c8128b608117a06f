//! Natural-language search and code suggestion endpoints
//!
//! Both answer 200 with a `status`; an unavailable or confused model is an
//! outcome the user sees, not an HTTP error.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::DashboardState;
use super::search::{SearchResponse, record_outcome};
use crate::api::auth::SessionId;
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::domain::SearchStatus;
use crate::domain::search::apply_codes;
use crate::domain::session::ResultOrigin;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AskRequest {
    #[validate(length(max = 2000, message = "Question is too long"))]
    pub question: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SuggestCodesRequest {
    /// Goods description in free text
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: String,
    /// Put the suggested codes into the `uktzed_codes` filter
    #[serde(default)]
    pub apply: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestCodesResponse {
    pub status: SearchStatus,
    pub codes: Vec<String>,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

pub fn routes(state: DashboardState) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/suggest/codes", post(suggest_codes))
        .with_state(state)
}

/// Answer a question by generated, guarded SQL
#[utoipa::path(
    post,
    path = "/api/v1/ask",
    tag = "oracle",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Search outcome; failures are reported in `status`", body = SearchResponse),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn ask(
    State(state): State<DashboardState>,
    session_id: SessionId,
    ValidatedJson(request): ValidatedJson<AskRequest>,
) -> Json<SearchResponse> {
    let session = state.session(&session_id);
    let generation = session.lock().filters.generation();

    let outcome = state.search.ask(&request.question).await;
    tracing::debug!(status = ?outcome.status, rows = outcome.table.len(), "Question answered");
    Json(record_outcome(&session, ResultOrigin::Question, generation, outcome))
}

/// Suggest УКТЗЕД codes for a goods description
#[utoipa::path(
    post,
    path = "/api/v1/suggest/codes",
    tag = "oracle",
    request_body = SuggestCodesRequest,
    responses(
        (status = 200, description = "Suggested codes", body = SuggestCodesResponse),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn suggest_codes(
    State(state): State<DashboardState>,
    session_id: SessionId,
    ValidatedJson(request): ValidatedJson<SuggestCodesRequest>,
) -> Result<Json<SuggestCodesResponse>, ApiError> {
    let outcome = state.search.suggest_codes(&request.description).await;

    let applied = request.apply && outcome.status == SearchStatus::Ok && !outcome.codes.is_empty();
    if applied {
        let session = state.session(&session_id);
        apply_codes(&mut session.lock().filters, &outcome.codes)?;
        tracing::debug!(count = outcome.codes.len(), "Suggested codes applied");
    }

    Ok(Json(SuggestCodesResponse {
        status: outcome.status,
        codes: outcome.codes,
        applied,
        message: outcome.message,
        raw: outcome.raw,
    }))
}
