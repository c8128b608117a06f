//! Cache backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Cache backend trait
///
/// Single-key operations are atomic. Counter operations back the rate limiter.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a value in the cache with optional TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Atomic increment with TTL (creates key if not exists)
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, CacheError>;

    /// Current counter value without incrementing
    ///
    /// Returns None if the counter doesn't exist or has expired.
    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError>;

    /// Get the TTL remaining for a key
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    async fn health_check(&self) -> Result<(), CacheError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
