//! Caller-side access to the product listing

mod fetcher;
mod product_client;

pub use fetcher::{HttpProductFetcher, ProductFetcher};
pub use product_client::{ClientState, ProductClient, DEFAULT_FETCH_TIMEOUT};

#[cfg(test)]
pub use fetcher::mock::MockProductFetcher;
