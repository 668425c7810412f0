//! Cached resource serving with conditional revalidation

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::cache::{CacheEntry, CacheKey, Fingerprint};
use crate::domain::{DomainError, ResourceGenerator};
use crate::infrastructure::cache::TieredCache;
use crate::infrastructure::coalesce::SingleFlight;

/// Configuration for resource caching
#[derive(Debug, Clone)]
pub struct ResourceCacheConfig {
    /// How long a generated entry stays valid in the cache tiers
    pub entry_ttl: Duration,
    /// Freshness hint sent to callers (`Cache-Control: max-age`)
    pub max_age: Duration,
    /// Upper bound on a single generation
    pub generation_timeout: Duration,
}

impl Default for ResourceCacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(30),
            max_age: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(10),
        }
    }
}

impl ResourceCacheConfig {
    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }
}

/// What to send back for a (possibly conditional) read
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalResponse {
    /// The caller's validator matches the current entry; send no body
    NotModified {
        fingerprint: Fingerprint,
        max_age: Duration,
    },
    /// Send the payload along with its validator
    Full {
        entry: Arc<CacheEntry>,
        max_age: Duration,
    },
}

impl ConditionalResponse {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            ConditionalResponse::NotModified { fingerprint, .. } => fingerprint,
            ConditionalResponse::Full { entry, .. } => entry.fingerprint(),
        }
    }

    pub fn max_age(&self) -> Duration {
        match self {
            ConditionalResponse::NotModified { max_age, .. }
            | ConditionalResponse::Full { max_age, .. } => *max_age,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, ConditionalResponse::NotModified { .. })
    }
}

/// Serves resources through the tiered cache, generating at most once per key
///
/// ## Read path
///
/// 1. Local tier hit: returned directly, no coordination
/// 2. Otherwise the key enters the single-flight table; the leader checks
///    both tiers again (promoting shared hits) and only generates when
///    both miss. The new entry is written to both tiers before waiters are
///    released.
#[derive(Debug)]
pub struct ResourceCacheService {
    cache: TieredCache,
    generator: Arc<dyn ResourceGenerator>,
    flights: SingleFlight<CacheKey, Arc<CacheEntry>>,
    config: ResourceCacheConfig,
}

impl ResourceCacheService {
    pub fn new(cache: TieredCache, generator: Arc<dyn ResourceGenerator>) -> Self {
        Self::with_config(cache, generator, ResourceCacheConfig::default())
    }

    pub fn with_config(
        cache: TieredCache,
        generator: Arc<dyn ResourceGenerator>,
        config: ResourceCacheConfig,
    ) -> Self {
        let flights = SingleFlight::with_timeout(config.generation_timeout);

        Self {
            cache,
            generator,
            flights,
            config,
        }
    }

    pub fn config(&self) -> &ResourceCacheConfig {
        &self.config
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Returns the live entry for `key`, generating it if absent or expired
    pub async fn current_entry(&self, key: &CacheKey) -> Result<Arc<CacheEntry>, DomainError> {
        if let Some(entry) = self.cache.get_local(key).await {
            return Ok(Arc::new(entry));
        }

        let cache = self.cache.clone();
        let generator = Arc::clone(&self.generator);
        let entry_ttl = self.config.entry_ttl;
        let key_owned = key.clone();

        self.flights
            .resolve(key.clone(), move || async move {
                if let Some(entry) = cache.get(&key_owned).await {
                    return Ok(Arc::new(entry));
                }

                debug!(key = %key_owned, "Generating resource");
                let payload = generator.generate(&key_owned).await?;
                let entry = CacheEntry::new(key_owned, payload, entry_ttl);

                cache.set(&entry).await;
                Ok(Arc::new(entry))
            })
            .await
    }

    /// Answers a read, honouring the caller's validator
    ///
    /// `if_none_match` is the raw `If-None-Match` value, if any.
    pub async fn respond(
        &self,
        key: &CacheKey,
        if_none_match: Option<&str>,
    ) -> Result<ConditionalResponse, DomainError> {
        let entry = self.current_entry(key).await?;
        let max_age = self.config.max_age;

        if if_none_match.is_some_and(|validator| entry.fingerprint().matches(validator)) {
            debug!(key = %key, etag = %entry.fingerprint(), "Validator matches, not modified");
            return Ok(ConditionalResponse::NotModified {
                fingerprint: entry.fingerprint().clone(),
                max_age,
            });
        }

        Ok(ConditionalResponse::Full { entry, max_age })
    }
}
