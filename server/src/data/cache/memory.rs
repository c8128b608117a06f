//! In-memory cache using moka + dashmap
//!
//! moka holds cached values with per-entry TTLs; dashmap holds the fixed
//! window counters used by the rate limiter.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;

use super::backend::CacheBackend;
use super::error::CacheError;
use crate::core::config::CacheConfig;

/// Default counter window when none is given
const DEFAULT_COUNTER_TTL: Duration = Duration::from_secs(60);

/// Expired counters are swept every this many increments
const COUNTER_SWEEP_EVERY: u64 = 256;

#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    ttl: Option<Duration>,
    created_at: Instant,
}

/// Per-entry expiry from the TTL stored with the value
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

struct Counter {
    count: AtomicI64,
    expires_at: Instant,
}

pub struct InMemoryCache {
    cache: Cache<String, CacheEntry>,
    counters: DashMap<String, Counter>,
    ops: AtomicU64,
}

impl InMemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .initial_capacity((config.max_entries as usize / 4).min(10_000))
            .expire_after(EntryTtl)
            .build();

        Self {
            cache,
            counters: DashMap::new(),
            ops: AtomicU64::new(0),
        }
    }

    fn sweep_counters(&self) {
        let now = Instant::now();
        self.counters.retain(|_, c| now < c.expires_at);
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.data))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            data: value,
            ttl,
            created_at: Instant::now(),
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, CacheError> {
        use dashmap::mapref::entry::Entry;

        let now = Instant::now();
        let expires_at = now + ttl.unwrap_or(DEFAULT_COUNTER_TTL);

        // Entry API holds the shard lock for the whole read-modify-write
        let count = match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let counter = occupied.get_mut();
                if now >= counter.expires_at {
                    counter.count.store(1, Ordering::SeqCst);
                    counter.expires_at = expires_at;
                    1
                } else {
                    counter.count.fetch_add(1, Ordering::SeqCst) + 1
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Counter {
                    count: AtomicI64::new(1),
                    expires_at,
                });
                1
            }
        };

        if self.ops.fetch_add(1, Ordering::Relaxed) % COUNTER_SWEEP_EVERY == 0 {
            self.sweep_counters();
        }

        Ok(count)
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .filter(|c| now < c.expires_at)
            .map(|c| c.count.load(Ordering::SeqCst)))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        if let Some(counter) = self.counters.get(key) {
            let remaining = counter.expires_at.saturating_duration_since(Instant::now());
            return Ok((remaining > Duration::ZERO).then_some(remaining));
        }

        let Some(entry) = self.cache.get(key).await else {
            return Ok(None);
        };
        Ok(entry
            .ttl
            .and_then(|ttl| ttl.checked_sub(entry.created_at.elapsed()))
            .filter(|remaining| *remaining > Duration::ZERO))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> InMemoryCache {
        InMemoryCache::new(&CacheConfig {
            max_entries: 100,
            reference_ttl_secs: 60,
        })
    }

    #[tokio::test]
    async fn test_set_get() {
        let cache = cache();
        cache.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = cache();
        cache
            .set("k", b"v".to_vec(), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        cache.cache.run_pending_tasks().await;

        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_counts_within_window() {
        let cache = cache();
        let ttl = Some(Duration::from_secs(60));
        assert_eq!(cache.incr("c", ttl).await.unwrap(), 1);
        assert_eq!(cache.incr("c", ttl).await.unwrap(), 2);
        assert_eq!(cache.get_counter("c").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_incr_resets_after_window() {
        let cache = cache();
        cache.incr("c", Some(Duration::from_millis(1))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(cache.get_counter("c").await.unwrap(), None);
        assert_eq!(cache.incr("c", Some(Duration::from_secs(60))).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ttl() {
        let cache = cache();
        cache.incr("c", Some(Duration::from_secs(60))).await.unwrap();
        assert!(cache.ttl("c").await.unwrap().unwrap() > Duration::from_secs(50));

        cache
            .set("k", b"v".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        let secs = cache.ttl("k").await.unwrap().unwrap().as_secs();
        assert!((58..=60).contains(&secs));

        cache.set("forever", b"v".to_vec(), None).await.unwrap();
        assert_eq!(cache.ttl("forever").await.unwrap(), None);
        assert_eq!(cache.ttl("missing").await.unwrap(), None);
    }
}
