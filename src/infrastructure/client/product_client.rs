//! Caller-side product cache with load coalescing

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::fetcher::ProductFetcher;
use crate::domain::{CacheKey, DomainError, Product, PRODUCT_LIST_KEY};
use crate::infrastructure::coalesce::SingleFlight;
use crate::infrastructure::observability::FlightSource;

/// Bound on a single load, shared by every caller joined to it
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable state of the client cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Empty,
    Loading,
    Ready,
}

/// Keeps the last product listing in memory and shares in-flight loads
///
/// - `Ready` and not forcing: the cached listing is returned without I/O
/// - otherwise the caller starts a load or joins the one already running
///
/// Cancelling a caller's token only stops that caller from waiting. The
/// load itself is bounded by the fetch timeout, which fails every waiter.
#[derive(Debug)]
pub struct ProductClient {
    fetcher: Arc<dyn ProductFetcher>,
    cached: Arc<RwLock<Option<Arc<Vec<Product>>>>>,
    loads: SingleFlight<CacheKey, Arc<Vec<Product>>>,
    key: CacheKey,
}

impl ProductClient {
    pub fn new(fetcher: Arc<dyn ProductFetcher>) -> Self {
        Self::with_timeout(fetcher, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(fetcher: Arc<dyn ProductFetcher>, timeout: Duration) -> Self {
        Self {
            fetcher,
            cached: Arc::new(RwLock::new(None)),
            loads: SingleFlight::with_timeout(timeout).with_source(FlightSource::ClientLoad),
            key: CacheKey::new(PRODUCT_LIST_KEY),
        }
    }

    /// Returns the product listing, loading it when needed
    pub async fn fetch(
        &self,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<Product>>, DomainError> {
        if !force_refresh {
            if let Some(products) = self.cached.read().await.clone() {
                debug!(count = products.len(), "Serving products from client cache");
                return Ok(products);
            }
        }

        if cancel.is_cancelled() {
            return Err(DomainError::cancelled("Product fetch cancelled before it started"));
        }

        let fetcher = Arc::clone(&self.fetcher);
        let cached = Arc::clone(&self.cached);

        let load = self.loads.resolve(self.key.clone(), move || async move {
            let products = Arc::new(fetcher.fetch_products().await?);
            *cached.write().await = Some(Arc::clone(&products));
            Ok(products)
        });

        tokio::select! {
            result = load => result,
            _ = cancel.cancelled() => {
                debug!("Caller stopped waiting for product load");
                Err(DomainError::cancelled("Product fetch cancelled by caller"))
            }
        }
    }

    /// Drops the cached listing; a load already running still completes
    /// and repopulates the cache
    pub async fn clear_cache(&self) {
        *self.cached.write().await = None;
        debug!("Client product cache cleared");
    }

    /// The cached listing, without loading
    pub async fn cached(&self) -> Option<Arc<Vec<Product>>> {
        self.cached.read().await.clone()
    }

    pub async fn state(&self) -> ClientState {
        if self.loads.in_flight(&self.key) {
            return ClientState::Loading;
        }

        match self.cached.read().await.as_ref() {
            Some(_) => ClientState::Ready,
            None => ClientState::Empty,
        }
    }
}
