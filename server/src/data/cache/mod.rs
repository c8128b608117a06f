//! Cache module
//!
//! In-memory cache (moka + dashmap) with a typed MessagePack API, plus the
//! rate limiter built on its counters.

mod backend;
mod error;
mod key;
mod memory;
pub mod rate_limiter;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::CacheBackend;
pub use error::CacheError;
pub use key::CacheKey;
pub use rate_limiter::{RateLimitBucket, RateLimitResult, RateLimiter};

use memory::InMemoryCache;

use crate::core::config::CacheConfig;

/// Typed access to the cache backend
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl CacheService {
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        if config.max_entries == 0 {
            return Err(CacheError::Config(
                "max_entries must be greater than 0".to_string(),
            ));
        }
        tracing::debug!(max_entries = config.max_entries, "Initializing in-memory cache");
        Ok(Self {
            backend: Arc::new(InMemoryCache::new(config)),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Get a typed value (MessagePack)
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.backend.get(key).await? {
            Some(bytes) => {
                let value = rmp_serde::from_slice(&bytes)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value (MessagePack)
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let bytes =
            rmp_serde::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.backend.set(key, bytes, ttl).await
    }

    pub async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, CacheError> {
        self.backend.incr(key, ttl).await
    }

    pub async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.backend.get_counter(key).await
    }

    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.backend.ttl(key).await
    }

    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::SqlValue;

    #[tokio::test]
    async fn test_typed_get_set() {
        let service = CacheService::new(&CacheConfig::default()).unwrap();
        let values = vec![
            SqlValue::Integer(2023),
            SqlValue::Text("Імпорт".to_string()),
            SqlValue::Number(1.5),
        ];

        service.set("opts", &values, None).await.unwrap();
        let fetched: Option<Vec<SqlValue>> = service.get("opts").await.unwrap();
        assert_eq!(fetched, Some(values));
    }

    #[tokio::test]
    async fn test_get_wrong_type_is_serialization_error() {
        let service = CacheService::new(&CacheConfig::default()).unwrap();
        service.set("k", &"text", None).await.unwrap();
        let result: Result<Option<Vec<i64>>, _> = service.get("k").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            CacheService::new(&config),
            Err(CacheError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_backend_name_and_health() {
        let service = CacheService::new(&CacheConfig::default()).unwrap();
        assert_eq!(service.backend_name(), "memory");
        assert!(service.health_check().await.is_ok());
    }
}
