//! Fixed window rate limiter on top of the cache counters
//!
//! Each window starts with the first request for an identifier and lasts
//! `window_secs`. The allowed total is `requests_per_window + burst`.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::CacheService;
use super::key::CacheKey;
use crate::core::constants::DEFAULT_RATE_LIMIT_WINDOW_SECS;

#[derive(Debug, Clone)]
pub struct RateLimitBucket {
    pub name: &'static str,
    pub requests_per_window: u32,
    pub window_secs: u64,
    /// Additional requests allowed above the sustained rate
    pub burst: u32,
}

impl RateLimitBucket {
    /// Login attempts, keyed by client IP
    pub fn auth(rpm: u32) -> Self {
        Self {
            name: "auth",
            requests_per_window: rpm,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            burst: rpm / 3,
        }
    }

    /// Oracle calls, keyed by session
    pub fn oracle(rpm: u32) -> Self {
        Self {
            name: "oracle",
            requests_per_window: rpm,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            burst: rpm / 10,
        }
    }

    pub fn total_limit(&self) -> u32 {
        self.requests_per_window.saturating_add(self.burst)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    /// Unix timestamp when the window resets
    pub reset_at: u64,
    /// Seconds until retry (only if blocked)
    pub retry_after: Option<u64>,
}

pub struct RateLimiter {
    cache: Arc<CacheService>,
}

impl RateLimiter {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Count one request and report whether it is within the limit
    pub async fn check(&self, bucket: &RateLimitBucket, identifier: &str) -> RateLimitResult {
        let key = CacheKey::rate_limit(bucket.name, identifier);
        let window = Duration::from_secs(bucket.window_secs);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "System clock is before UNIX epoch");
                0
            });

        let count = match self.cache.incr(&key, Some(window)).await {
            Ok(c) => c,
            Err(e) => {
                // Cache trouble must not lock users out
                tracing::error!(
                    bucket = bucket.name,
                    error = %e,
                    "Rate limit increment failed, allowing request"
                );
                1
            }
        };

        let limit = bucket.total_limit();
        let limit_i64 = i64::from(limit);
        let allowed = count <= limit_i64;
        let remaining = limit_i64.saturating_sub(count).try_into().unwrap_or(0u32);

        let ttl = self.cache.ttl(&key).await.ok().flatten();
        let reset_at = now.saturating_add(ttl.map_or(bucket.window_secs, |d| d.as_secs()));

        tracing::trace!(bucket = bucket.name, count, limit, allowed, "Rate limit check");

        RateLimitResult {
            allowed,
            remaining,
            limit,
            reset_at,
            retry_after: (!allowed).then(|| reset_at.saturating_sub(now).max(1)),
        }
    }

    /// Whether the identifier is over the limit, without counting a request
    pub async fn is_blocked(&self, bucket: &RateLimitBucket, identifier: &str) -> bool {
        let key = CacheKey::rate_limit(bucket.name, identifier);
        match self.cache.get_counter(&key).await {
            Ok(Some(count)) => count >= i64::from(bucket.total_limit()),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(bucket = bucket.name, error = %e, "Rate limit pre-check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CacheConfig;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(CacheService::new(&CacheConfig::default()).unwrap()))
    }

    fn bucket(requests: u32) -> RateLimitBucket {
        RateLimitBucket {
            name: "test",
            requests_per_window: requests,
            window_secs: 60,
            burst: 0,
        }
    }

    #[test]
    fn test_bucket_limits() {
        assert_eq!(RateLimitBucket::auth(10).total_limit(), 13);
        assert_eq!(RateLimitBucket::oracle(20).total_limit(), 22);
    }

    #[tokio::test]
    async fn test_blocks_after_limit() {
        let limiter = limiter();
        let bucket = bucket(2);

        assert!(limiter.check(&bucket, "ip").await.allowed);
        let second = limiter.check(&bucket, "ip").await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = limiter.check(&bucket, "ip").await;
        assert!(!third.allowed);
        assert!(third.retry_after.is_some());
        assert!(limiter.is_blocked(&bucket, "ip").await);
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let limiter = limiter();
        let bucket = bucket(1);

        assert!(limiter.check(&bucket, "a").await.allowed);
        assert!(!limiter.check(&bucket, "a").await.allowed);
        assert!(limiter.check(&bucket, "b").await.allowed);
        assert!(!limiter.is_blocked(&bucket, "c").await);
    }
}
