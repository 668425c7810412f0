//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::cache::TieredCache;
use crate::infrastructure::services::{CacheInvalidator, ResourceCacheService};

/// Services shared by every request handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub resources: Arc<ResourceCacheService>,
    pub invalidator: Arc<CacheInvalidator>,
    pub cache: TieredCache,
}

impl AppState {
    /// Builds the state around a resource service; the invalidator works on
    /// the same tiers
    pub fn new(resources: Arc<ResourceCacheService>) -> Self {
        let cache = resources.cache().clone();
        let invalidator = Arc::new(CacheInvalidator::new(cache.clone()));

        Self {
            resources,
            invalidator,
            cache,
        }
    }
}
