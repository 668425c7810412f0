//! Redis cache implementation (shared tier)

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
    /// Namespace shared by every process serving the same catalog
    pub key_prefix: Option<String>,
    /// Bound on establishing the connection at startup
    pub connection_timeout: Duration,
    /// Bound on any single command; exceeding it counts as a miss upstream
    pub operation_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_millis(250),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// Shared tier on Redis
///
/// Entries expire server-side (`PSETEX`). Every command is bounded by
/// `operation_timeout`; a slow or unreachable server surfaces as
/// `DomainError::CacheBackend`.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Connects within `connection_timeout`; failing to reach the server is
    /// `CacheBackend`, a malformed URL is `Configuration`
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            DomainError::configuration(format!("Failed to create Redis client: {}", e))
        })?;

        let connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                DomainError::cache_backend(format!(
                    "Timed out connecting to Redis after {:?}",
                    config.connection_timeout
                ))
            })?
            .map_err(|e| DomainError::cache_backend(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    fn namespaced(&self, key: &str) -> String {
        self.config
            .key_prefix
            .as_ref()
            .map_or_else(|| key.to_string(), |prefix| format!("{}:{}", prefix, key))
    }

    async fn bounded<T, F>(&self, op: &str, key: &str, command: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        within(self.config.operation_timeout, op, key, command).await
    }
}

/// Runs one Redis command under `limit`; errors and overruns are `CacheBackend`
async fn within<T, F>(limit: Duration, op: &str, key: &str, command: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match tokio::time::timeout(limit, command).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DomainError::cache_backend(format!(
            "Failed to {} key '{}': {}",
            op, key, e
        ))),
        Err(_) => Err(DomainError::cache_backend(format!(
            "Redis {} of key '{}' timed out after {:?}",
            op, key, limit
        ))),
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let redis_key = self.namespaced(key);
        let mut conn = self.connection.clone();

        self.bounded("get", key, conn.get(&redis_key)).await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let redis_key = self.namespaced(key);
        let mut conn = self.connection.clone();

        // Redis expiry has millisecond resolution; never write a key without one
        let ttl_millis = ttl.as_millis().max(1) as u64;

        self.bounded("set", key, conn.pset_ex(&redis_key, value, ttl_millis))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let redis_key = self.namespaced(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = self.bounded("delete", key, conn.del(&redis_key)).await?;
        Ok(deleted > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let redis_key = self.namespaced(key);
        let mut conn = self.connection.clone();

        // -2 for a missing key, -1 for one without expiry
        let ttl_millis: i64 = self.bounded("read TTL of", key, conn.pttl(&redis_key)).await?;

        Ok(u64::try_from(ttl_millis).ok().map(Duration::from_millis))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        self.bounded("ping", "-", redis::cmd("PING").query_async::<String>(&mut conn))
            .await
            .map(|_| ())
    }
}
