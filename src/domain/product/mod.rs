//! Product domain - the placeholder catalog served through the cache

mod entity;
mod generator;

pub use entity::{default_products, Category, Product};
pub use generator::{ResourceGenerator, StaticProductCatalog, PRODUCT_LIST_KEY};

#[cfg(test)]
pub use generator::mock::CountingGenerator;
