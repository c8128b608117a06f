//! Rate limiting middleware for API routes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::auth::SessionId;
use crate::data::cache::{RateLimitBucket, RateLimitResult, RateLimiter};

/// Rate limit middleware state
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub bucket: RateLimitBucket,
    pub key_extractor: KeyExtractor,
}

/// How to extract rate limit key from request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyExtractor {
    /// Client IP, honouring the first `X-Forwarded-For` hop
    IpAddress,
    /// Search session injected by the auth middleware
    Session,
}

/// Rate limit exceeded response
pub struct RateLimitExceeded(RateLimitResult);

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let r = &self.0;
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "too_many_requests",
                "code": "RATE_LIMITED",
                "message": "Rate limit exceeded"
            })),
        )
            .into_response();

        let headers = response.headers_mut();
        insert_rate_limit_headers(headers, r);
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(r.retry_after.unwrap_or(60)),
        );
        response
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset_at));
}

fn extract_key(request: &Request, key_extractor: KeyExtractor, addr: SocketAddr) -> String {
    match key_extractor {
        KeyExtractor::IpAddress => request
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| addr.ip().to_string()),
        KeyExtractor::Session => request
            .extensions()
            .get::<SessionId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| addr.ip().to_string()),
    }
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitExceeded> {
    let key = extract_key(&request, state.key_extractor, addr);
    let result = state.limiter.check(&state.bucket, &key).await;

    if !result.allowed {
        tracing::debug!(bucket = state.bucket.name, "Rate limit exceeded");
        return Err(RateLimitExceeded(result));
    }

    let mut response = next.run(request).await;
    insert_rate_limit_headers(response.headers_mut(), &result);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn addr() -> SocketAddr {
        "10.0.0.7:40000".parse().unwrap()
    }

    #[test]
    fn test_ip_key_prefers_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_key(&request, KeyExtractor::IpAddress, addr()),
            "203.0.113.9"
        );
    }

    #[test]
    fn test_ip_key_falls_back_to_peer() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(
            extract_key(&request, KeyExtractor::IpAddress, addr()),
            "10.0.0.7"
        );
    }

    #[test]
    fn test_session_key_uses_extension() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(SessionId("session-1".to_string()));
        assert_eq!(
            extract_key(&request, KeyExtractor::Session, addr()),
            "session-1"
        );
    }

    #[test]
    fn test_rate_limit_exceeded_response() {
        let result = RateLimitResult {
            allowed: false,
            remaining: 0,
            limit: 10,
            reset_at: 1705593600,
            retry_after: Some(45),
        };
        let response = RateLimitExceeded(result).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "45");
        assert_eq!(response.headers()["X-RateLimit-Limit"], "10");
    }
}
