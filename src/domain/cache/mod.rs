//! Cache domain - keys, entries, validators and the tier abstraction

mod entry;
mod fingerprint;
mod key;
mod repository;

pub use entry::CacheEntry;
pub use fingerprint::Fingerprint;
pub use key::CacheKey;
pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;

/// Which tier of the tiered cache served or stored an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Process-scoped, fast, short-lived
    Local,
    /// Cross-process, slower, can outlive a single process
    Shared,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Local => "local",
            CacheTier::Shared => "shared",
        }
    }
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
