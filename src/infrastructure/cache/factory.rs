//! Cache factory for runtime selection of the shared tier

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};
use super::tiered::TieredCache;

/// Supported shared-tier backends
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SharedCacheType {
    /// No shared tier; the local tier is the whole cache
    #[default]
    None,
    /// A second in-memory store (single process, useful for tests and demos)
    InMemory,
    /// Redis
    Redis,
}

impl std::fmt::Display for SharedCacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SharedCacheType::None => write!(f, "none"),
            SharedCacheType::InMemory => write!(f, "in_memory"),
            SharedCacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for SharedCacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "disabled" | "" => Ok(SharedCacheType::None),
            "in_memory" | "inmemory" | "memory" => Ok(SharedCacheType::InMemory),
            "redis" => Ok(SharedCacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown shared cache type: {}. Valid types: none, in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Type of shared tier to create
    pub shared_type: SharedCacheType,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Key prefix for namespacing in the shared tier
    pub key_prefix: Option<String>,
    /// Upper bound on local entry lifetime
    pub local_ttl: Duration,
    /// Maximum capacity of the local tier
    pub max_capacity: u64,
    /// Per-command timeout for the shared tier
    pub operation_timeout: Duration,
    /// Timeout for establishing the shared tier connection
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shared_type: SharedCacheType::None,
            redis_url: None,
            key_prefix: None,
            local_ttl: Duration::from_secs(30),
            max_capacity: 10_000,
            operation_timeout: Duration::from_millis(250),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Creates a configuration without a shared tier
    pub fn local_only() -> Self {
        Self::default()
    }

    /// Creates a configuration with a Redis shared tier
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            shared_type: SharedCacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Sets the shared tier type
    pub fn with_shared_type(mut self, shared_type: SharedCacheType) -> Self {
        self.shared_type = shared_type;
        self
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the local tier TTL bound
    pub fn with_local_ttl(mut self, ttl: Duration) -> Self {
        self.local_ttl = ttl;
        self
    }

    /// Sets the maximum capacity of the local tier
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Sets the shared tier operation timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets the shared tier connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Creates the local tier
    pub fn create_local(&self, config: &CacheConfig) -> Arc<dyn Cache> {
        let local_config = InMemoryCacheConfig::default()
            .with_max_ttl(config.local_ttl)
            .with_max_capacity(config.max_capacity);

        Arc::new(InMemoryCache::with_config(local_config))
    }

    /// Creates the shared tier, if one is configured
    pub async fn create_shared(
        &self,
        config: &CacheConfig,
    ) -> Result<Option<Arc<dyn Cache>>, DomainError> {
        match config.shared_type {
            SharedCacheType::None => Ok(None),
            SharedCacheType::InMemory => {
                let shared = InMemoryCache::with_config(
                    InMemoryCacheConfig::default().with_max_capacity(config.max_capacity),
                );
                Ok(Some(Arc::new(shared)))
            }
            SharedCacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis cache type")
                })?;

                let mut redis_config = RedisCacheConfig::new(url)
                    .with_operation_timeout(config.operation_timeout)
                    .with_connection_timeout(config.connect_timeout);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let cache = RedisCache::new(redis_config).await?;
                Ok(Some(Arc::new(cache)))
            }
        }
    }

    /// Creates the tiered cache
    ///
    /// An unreachable shared tier is not fatal: the cache starts local-only.
    /// Configuration errors still fail.
    pub async fn create_tiered(&self, config: &CacheConfig) -> Result<TieredCache, DomainError> {
        let local = self.create_local(config);

        let shared = match self.create_shared(config).await {
            Ok(shared) => shared,
            Err(DomainError::CacheBackend { message }) => {
                warn!(
                    backend = %config.shared_type,
                    error = %message,
                    "Shared cache tier unavailable, running local-only"
                );
                None
            }
            Err(e) => return Err(e),
        };

        info!(
            shared = %config.shared_type,
            enabled = shared.is_some(),
            "Tiered cache created"
        );

        Ok(TieredCache::new(local, shared))
    }
}
