//! Storage contract for a single cache tier

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// One tier of the tiered cache: string values keyed by resource, each with
/// its own expiry
///
/// Values cross the trait as JSON text so tiers stay object safe; `CacheExt`
/// adds the typed view.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Stores `value`, replacing any previous value; it stops being served after `ttl`
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Returns whether something was removed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Time left before `key` expires, `None` when absent
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    /// Verifies the backend is reachable
    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Typed get/set over any tier
pub trait CacheExt: Cache {
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            self.get_raw(key)
                .await?
                .map(|data| serde_json::from_str(&data))
                .transpose()
                .map_err(|e| {
                    DomainError::serialization(format!("Unreadable value under '{}': {}", key, e))
                })
        }
    }

    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::serialization(format!("Unable to encode value for '{}': {}", key, e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}
