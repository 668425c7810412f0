//! Infrastructure services

mod cache_invalidator;
mod resource_cache_service;

pub use cache_invalidator::{CacheInvalidator, Eviction};
pub use resource_cache_service::{ConditionalResponse, ResourceCacheConfig, ResourceCacheService};
