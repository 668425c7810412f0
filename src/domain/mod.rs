//! Domain layer - Core types and contracts

pub mod cache;
pub mod error;
pub mod product;

pub use cache::{Cache, CacheEntry, CacheExt, CacheKey, CacheTier, Fingerprint};
pub use error::DomainError;
pub use product::{
    default_products, Category, Product, ResourceGenerator, StaticProductCatalog,
    PRODUCT_LIST_KEY,
};
