//! Cached resource entries

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CacheKey, Fingerprint};

/// A generated resource together with its validator and freshness window
///
/// Entries are immutable: a regeneration builds a new entry instead of
/// mutating the cached one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    key: CacheKey,
    payload: String,
    fingerprint: Fingerprint,
    created_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    /// Builds an entry from a serialized payload, fingerprinting it
    pub fn new(key: CacheKey, payload: impl Into<String>, ttl: Duration) -> Self {
        let payload = payload.into();
        let fingerprint = Fingerprint::compute(payload.as_bytes());

        Self {
            key,
            payload,
            fingerprint,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Overrides the creation timestamp
    pub fn created_at_time(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Serialized payload (JSON)
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Time elapsed since generation; zero if the clock went backwards
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at).to_std().unwrap_or_default()
    }

    /// Time left before the entry expires
    pub fn remaining_ttl(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }

    pub fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }
}
