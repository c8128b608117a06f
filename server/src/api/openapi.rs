//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{auth, filters, health, oracle, search};
use crate::domain::SearchStatus;
use crate::domain::filters::{BoundParam, FilterKind, FilterValue, ScalarType, SqlValue};
use crate::domain::results::{DisplayTable, Summary};
use crate::domain::session::ResultOrigin;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Deklarant API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Customs declarations dashboard"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Password gate"),
        (name = "filters", description = "Filter values of the current session"),
        (name = "search", description = "Filtered search, stored results and export"),
        (name = "oracle", description = "Natural-language search and code suggestions")
    ),
    paths(
        health::health,
        auth::login,
        auth::auth_status,
        auth::logout,
        filters::list_filters,
        filters::filter_options,
        filters::set_filter,
        filters::reset_filter,
        filters::reset_all_filters,
        search::preview_query,
        search::run_search,
        search::stored_results,
        search::export_results,
        oracle::ask,
        oracle::suggest_codes,
    ),
    components(schemas(
        // Health
        health::HealthResponse,
        // Auth
        auth::LoginRequest,
        auth::LoginResponse,
        auth::AuthStatusResponse,
        // Filters
        FilterKind,
        ScalarType,
        FilterValue,
        SqlValue,
        filters::FilterDto,
        filters::FiltersResponse,
        filters::FilterOptionsResponse,
        filters::SetFilterRequest,
        // Search
        SearchStatus,
        ResultOrigin,
        BoundParam,
        DisplayTable,
        Summary,
        search::SearchResponse,
        search::QueryPreviewResponse,
        search::StoredResultsResponse,
        // Oracle
        oracle::AskRequest,
        oracle::SuggestCodesRequest,
        oracle::SuggestCodesResponse,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Deklarant API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_dashboard_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/health",
            "/api/v1/auth/login",
            "/api/v1/filters/{key}",
            "/api/v1/search",
            "/api/v1/search/export",
            "/api/v1/ask",
            "/api/v1/suggest/codes",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
