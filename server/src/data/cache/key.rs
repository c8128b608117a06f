//! Type-safe cache key builder with versioning

use crate::core::constants::CACHE_KEY_VERSION;

/// Cache key builder
///
/// All keys are prefixed with a version (e.g., "v1:") so a format change
/// never reads stale entries.
pub struct CacheKey;

impl CacheKey {
    /// Filter option list, keyed by the hash of its query text
    pub fn filter_options(sql: &str) -> String {
        format!("{}:opts:{:x}", CACHE_KEY_VERSION, md5::compute(sql.as_bytes()))
    }

    /// Rate limit counter for a bucket and identifier
    pub fn rate_limit(bucket: &str, identifier: &str) -> String {
        format!("{}:rl:{}:{}", CACHE_KEY_VERSION, bucket, identifier)
    }
}
