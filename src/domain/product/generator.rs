//! Resource generation (the origin behind the cache)

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use super::entity::{default_products, Product};
use crate::domain::cache::CacheKey;
use crate::domain::DomainError;

/// Key under which the product listing is served
pub const PRODUCT_LIST_KEY: &str = "productlist";

/// Produces the serialized payload for a resource key
///
/// Implementations are the expensive path the cache exists to avoid. They
/// return `DomainError::NotFound` for keys they do not serve.
#[async_trait]
pub trait ResourceGenerator: Send + Sync + Debug {
    async fn generate(&self, key: &CacheKey) -> Result<String, DomainError>;
}

/// Serves a fixed product listing, optionally with artificial latency
#[derive(Debug, Clone)]
pub struct StaticProductCatalog {
    products: Vec<Product>,
    latency: Duration,
}

impl Default for StaticProductCatalog {
    fn default() -> Self {
        Self::new(default_products())
    }
}

impl StaticProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            latency: Duration::ZERO,
        }
    }

    /// Sets a delay applied to every generation
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }
}

#[async_trait]
impl ResourceGenerator for StaticProductCatalog {
    async fn generate(&self, key: &CacheKey) -> Result<String, DomainError> {
        if key.as_str() != PRODUCT_LIST_KEY {
            return Err(DomainError::not_found(format!("Unknown resource '{}'", key)));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        serde_json::to_string(&self.products).map_err(|e| {
            DomainError::serialization(format!("Failed to serialize product list: {}", e))
        })
    }
}
