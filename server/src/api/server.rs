//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthManager, AuthState, require_auth};
use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::rate_limit::{KeyExtractor, RateLimitState, rate_limit_middleware};
use super::routes::{DashboardState, auth, filters, health, oracle, search};
use crate::core::CoreApp;
use crate::core::config::RateLimitConfig;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::data::cache::{RateLimitBucket, RateLimiter};

/// Everything the router needs, detached from [`CoreApp`]
#[derive(Clone)]
pub struct RouterDeps {
    pub auth_manager: Arc<AuthManager>,
    pub allowed_origins: AllowedOrigins,
    pub dashboard: DashboardState,
    pub rate_limiter: Arc<RateLimiter>,
    pub rate_limit: RateLimitConfig,
}

impl RouterDeps {
    pub fn from_app(app: &CoreApp) -> Self {
        Self {
            auth_manager: Arc::clone(&app.auth),
            allowed_origins: AllowedOrigins::new(&app.config.server.host, app.config.server.port),
            dashboard: DashboardState::new(Arc::clone(&app.search), app.sessions.clone()),
            rate_limiter: Arc::clone(&app.rate_limiter),
            rate_limit: app.config.rate_limit.clone(),
        }
    }
}

/// Build the full HTTP router
///
/// Health, docs and auth are public. Everything else under `/api/v1` sits
/// behind the session gate; oracle routes are additionally rate limited per
/// session, login per client IP.
pub fn build_router(deps: RouterDeps) -> Router {
    let RouterDeps {
        auth_manager,
        allowed_origins,
        dashboard,
        rate_limiter,
        rate_limit,
    } = deps;

    let make_rate_limit_state =
        |bucket: RateLimitBucket, key_extractor: KeyExtractor| RateLimitState {
            limiter: Arc::clone(&rate_limiter),
            bucket,
            key_extractor,
        };

    let login_routes = auth::login_routes(Arc::clone(&auth_manager), dashboard.sessions.clone());
    let login_routes = if rate_limit.enabled {
        login_routes.layer(axum::middleware::from_fn_with_state(
            make_rate_limit_state(
                RateLimitBucket::auth(rate_limit.auth_rpm),
                KeyExtractor::IpAddress,
            ),
            rate_limit_middleware,
        ))
    } else {
        login_routes
    };
    let auth_routes =
        auth::routes(Arc::clone(&auth_manager), dashboard.sessions.clone()).merge(login_routes);

    // Inner layer: runs after require_auth has inserted the SessionId
    let oracle_routes = oracle::routes(dashboard.clone());
    let oracle_routes = if rate_limit.enabled {
        oracle_routes.layer(axum::middleware::from_fn_with_state(
            make_rate_limit_state(
                RateLimitBucket::oracle(rate_limit.oracle_rpm),
                KeyExtractor::Session,
            ),
            rate_limit_middleware,
        ))
    } else {
        oracle_routes
    };

    let protected_routes = Router::new()
        .nest("/filters", filters::routes(dashboard.clone()))
        .nest("/search", search::routes(dashboard))
        .merge(oracle_routes)
        .layer(axum::middleware::from_fn_with_state(
            AuthState {
                auth_manager,
                allowed_origins: allowed_origins.clone(),
            },
            require_auth,
        ));

    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/docs", get(swagger_ui_html))
        .route("/api/docs/", get(swagger_ui_html))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1", protected_routes)
        .fallback(middleware::handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(middleware::cors(&allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered; returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);
        let router = build_router(RouterDeps::from_app(&app));

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "HTTP server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
