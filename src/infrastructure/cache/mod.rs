//! Cache infrastructure - tier implementations and the tiered cache

mod factory;
mod in_memory;
mod redis;
mod tiered;

pub use factory::{CacheConfig, CacheFactory, SharedCacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::{RedisCache, RedisCacheConfig};
pub use tiered::TieredCache;
