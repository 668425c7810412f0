//! Administrative cache eviction

use tracing::info;

use crate::domain::cache::CacheKey;
use crate::infrastructure::cache::TieredCache;
use crate::infrastructure::observability::record_eviction;

/// Acknowledgement of an eviction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub cleared: CacheKey,
}

/// Removes keys from every cache tier
///
/// Eviction always succeeds, including for keys that were never cached. A
/// generation already in flight for the key is not cancelled and may
/// repopulate the cache once it completes.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache: TieredCache,
}

impl CacheInvalidator {
    pub fn new(cache: TieredCache) -> Self {
        Self { cache }
    }

    pub async fn evict(&self, key: CacheKey) -> Eviction {
        self.cache.invalidate(&key).await;

        info!(key = %key, "Cache entry evicted");
        record_eviction();

        Eviction { cleared: key }
    }
}
