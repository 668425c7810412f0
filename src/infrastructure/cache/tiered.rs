//! Two-tier read-through cache

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::cache::{Cache, CacheEntry, CacheExt, CacheKey, CacheTier};
use crate::domain::DomainError;
use crate::infrastructure::observability::{
    record_cache_hit, record_cache_miss, record_shared_tier_error,
};

/// Local tier in front of an optional shared tier
///
/// ## Lookup Order
///
/// 1. Local tier (process memory)
/// 2. Shared tier, if configured; a hit is promoted into the local tier
///
/// Expired entries are misses in both tiers. Shared-tier failures are
/// logged and absorbed: reads degrade to a miss and writes keep the local
/// copy, so an unreachable shared tier only costs extra regenerations.
#[derive(Debug, Clone)]
pub struct TieredCache {
    local: Arc<dyn Cache>,
    shared: Option<Arc<dyn Cache>>,
}

impl TieredCache {
    pub fn new(local: Arc<dyn Cache>, shared: Option<Arc<dyn Cache>>) -> Self {
        Self { local, shared }
    }

    /// Cache without a shared tier (single-instance mode)
    pub fn local_only(local: Arc<dyn Cache>) -> Self {
        Self::new(local, None)
    }

    pub fn has_shared_tier(&self) -> bool {
        self.shared.is_some()
    }

    /// Looks a key up in the local tier only
    pub async fn get_local(&self, key: &CacheKey) -> Option<CacheEntry> {
        match read_live(self.local.as_ref(), key).await {
            Ok(Some(entry)) => {
                debug!(key = %key, "cache hit (local)");
                record_cache_hit(CacheTier::Local);
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Local tier read failed");
                None
            }
        }
    }

    /// Read-through lookup across both tiers
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if let Some(entry) = self.get_local(key).await {
            return Some(entry);
        }

        let Some(shared) = &self.shared else {
            debug!(key = %key, "cache miss");
            record_cache_miss();
            return None;
        };

        match read_live(shared.as_ref(), key).await {
            Ok(Some(entry)) => {
                debug!(key = %key, "cache hit (shared), promoting to local");
                record_cache_hit(CacheTier::Shared);
                self.write_local(&entry).await;
                Some(entry)
            }
            Ok(None) => {
                debug!(key = %key, "cache miss");
                record_cache_miss();
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Shared tier unavailable, treating as miss");
                record_shared_tier_error("get");
                record_cache_miss();
                None
            }
        }
    }

    /// Writes an entry to both tiers
    ///
    /// Never fails: a shared-tier write error is logged and the local copy kept.
    pub async fn set(&self, entry: &CacheEntry) {
        self.write_local(entry).await;

        if let Some(shared) = &self.shared {
            let key = entry.key();

            match shared.set(key.as_str(), entry, entry.remaining_ttl()).await {
                Ok(()) => debug!(key = %key, "cache set (local+shared)"),
                Err(e) => {
                    warn!(key = %key, error = %e, "Shared tier write failed, keeping local copy");
                    record_shared_tier_error("set");
                }
            }
        }
    }

    /// Removes a key from both tiers; absence is not an error
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.local.delete(key.as_str()).await {
            warn!(key = %key, error = %e, "Local tier delete failed");
        }

        if let Some(shared) = &self.shared {
            if let Err(e) = shared.delete(key.as_str()).await {
                warn!(key = %key, error = %e, "Shared tier delete failed");
                record_shared_tier_error("delete");
            }
        }

        debug!(key = %key, "cache invalidated");
    }

    /// Health of the shared tier; `None` when running local-only
    pub async fn shared_tier_health(&self) -> Option<Result<(), DomainError>> {
        match &self.shared {
            Some(shared) => Some(shared.ping().await),
            None => None,
        }
    }

    async fn write_local(&self, entry: &CacheEntry) {
        let key = entry.key();

        if let Err(e) = self.local.set(key.as_str(), entry, entry.remaining_ttl()).await {
            warn!(key = %key, error = %e, "Local tier write failed");
        }
    }
}

/// Reads an entry from one tier; one past its TTL is a miss
///
/// Nothing is deleted here: a concurrent writer may already have replaced
/// the stale value, and every tier expires its own keys.
async fn read_live(tier: &dyn Cache, key: &CacheKey) -> Result<Option<CacheEntry>, DomainError> {
    Ok(tier
        .get::<CacheEntry>(key.as_str())
        .await?
        .filter(|entry| !entry.is_expired()))
}
