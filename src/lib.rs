//! PMP Catalog Cache
//!
//! Serves expensive-to-generate resources over HTTP with:
//! - `ETag` / `If-None-Match` revalidation and `Cache-Control` freshness
//! - A two-tier cache (in-process moka, optional shared Redis)
//! - Single-flight generation so concurrent misses cost one generation
//! - A caller-side client that caches and coalesces its own loads

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::StaticProductCatalog;
use infrastructure::cache::CacheFactory;
use infrastructure::services::ResourceCacheService;

/// Wires the cache tiers, the catalog generator and the resource service
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let cache_config = config.cache.to_cache_config()?;
    let cache = CacheFactory::new().create_tiered(&cache_config).await?;

    let catalog = StaticProductCatalog::default()
        .with_latency(Duration::from_millis(config.catalog.simulated_latency_ms));

    let resources = ResourceCacheService::with_config(
        cache,
        Arc::new(catalog),
        config.resource_cache_config(),
    );

    tracing::info!(
        shared_tier = resources.cache().has_shared_tier(),
        entry_ttl = ?resources.config().entry_ttl,
        "Application state created"
    );

    Ok(AppState::new(Arc::new(resources)))
}
