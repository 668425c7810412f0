//! Product listing fetchers

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use tracing::debug;

use crate::domain::{DomainError, Product};

/// Source of the product listing for `ProductClient`
#[async_trait]
pub trait ProductFetcher: Send + Sync + Debug {
    async fn fetch_products(&self) -> Result<Vec<Product>, DomainError>;
}

/// Last body received together with its validator
#[derive(Debug, Clone)]
struct Remembered {
    etag: String,
    body: String,
}

/// Fetches the product listing over HTTP, revalidating with `If-None-Match`
///
/// When the server answers `304 Not Modified` the body remembered from the
/// previous `200` is reused instead of being downloaded again.
#[derive(Debug)]
pub struct HttpProductFetcher {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    remembered: Mutex<Option<Remembered>>,
}

impl HttpProductFetcher {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, DomainError> {
        Self::with_timeout(endpoint, Duration::from_secs(10))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            remembered: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validator of the last full response, if the server sent one
    pub fn etag(&self) -> Option<String> {
        self.remembered().map(|r| r.etag)
    }

    fn remembered(&self) -> Option<Remembered> {
        self.remembered.lock().ok().and_then(|r| r.clone())
    }

    fn remember(&self, etag: Option<String>, body: String) -> Result<(), DomainError> {
        let mut remembered = self
            .remembered
            .lock()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        *remembered = etag.map(|etag| Remembered { etag, body });
        Ok(())
    }

    fn map_request_error(&self, error: reqwest::Error) -> DomainError {
        if error.is_timeout() {
            DomainError::timeout(format!("GET {}", self.endpoint), self.timeout)
        } else {
            DomainError::upstream(format!("Request to {} failed: {}", self.endpoint, error))
        }
    }
}

fn parse_products(body: &str) -> Result<Vec<Product>, DomainError> {
    serde_json::from_str(body)
        .map_err(|e| DomainError::serialization(format!("Invalid product listing: {}", e)))
}

#[async_trait]
impl ProductFetcher for HttpProductFetcher {
    async fn fetch_products(&self) -> Result<Vec<Product>, DomainError> {
        let known = self.remembered();

        let mut request = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/json");

        if let Some(known) = &known {
            request = request.header(IF_NONE_MATCH, known.etag.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            let Some(known) = known else {
                return Err(DomainError::upstream(format!(
                    "{} answered 304 to an unconditional request",
                    self.endpoint
                )));
            };

            debug!(endpoint = %self.endpoint, etag = %known.etag, "Not modified, reusing body");
            return parse_products(&known.body);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::upstream(format!(
                "HTTP {} from {}: {}",
                status, self.endpoint, body
            )));
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let products = parse_products(&body)?;
        debug!(endpoint = %self.endpoint, count = products.len(), etag = ?etag, "Fetched product listing");

        self.remember(etag, body)?;
        Ok(products)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::domain::{default_products, Fingerprint};

    fn listing() -> String {
        serde_json::to_string(&default_products()).unwrap()
    }

    fn endpoint(server: &MockServer) -> String {
        format!("{}/api/productlist", server.uri())
    }

    #[tokio::test]
    async fn test_fetch_parses_products_and_remembers_etag() {
        let server = MockServer::start().await;
        let etag = Fingerprint::compute(listing().as_bytes());

        Mock::given(method("GET"))
            .and(path("/api/productlist"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(listing(), "application/json")
                    .insert_header("ETag", etag.as_str()),
            )
            .mount(&server)
            .await;

        let fetcher = HttpProductFetcher::new(endpoint(&server)).unwrap();
        let products = fetcher.fetch_products().await.unwrap();

        assert_eq!(products, default_products());
        assert_eq!(fetcher.etag(), Some(etag.to_string()));
    }

    #[tokio::test]
    async fn test_not_modified_reuses_remembered_body() {
        let server = MockServer::start().await;
        let etag = Fingerprint::compute(listing().as_bytes());

        Mock::given(method("GET"))
            .and(path("/api/productlist"))
            .and(header("If-None-Match", etag.as_str()))
            .respond_with(ResponseTemplate::new(304).insert_header("ETag", etag.as_str()))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/productlist"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(listing(), "application/json")
                    .insert_header("ETag", etag.as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpProductFetcher::new(endpoint(&server)).unwrap();

        let first = fetcher.fetch_products().await.unwrap();
        let second = fetcher.fetch_products().await.unwrap();

        assert_eq!(first, second);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_response_without_etag_is_not_revalidated() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/productlist"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(listing(), "application/json"))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = HttpProductFetcher::new(endpoint(&server)).unwrap();
        fetcher.fetch_products().await.unwrap();
        fetcher.fetch_products().await.unwrap();

        assert!(fetcher.etag().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let fetcher = HttpProductFetcher::new(endpoint(&server)).unwrap();
        let result = fetcher.fetch_products().await;

        assert!(matches!(result, Err(DomainError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let fetcher = HttpProductFetcher::new(endpoint(&server)).unwrap();
        let result = fetcher.fetch_products().await;

        assert!(matches!(result, Err(DomainError::Serialization { .. })));
        assert!(fetcher.etag().is_none());
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(listing(), "application/json")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher =
            HttpProductFetcher::with_timeout(endpoint(&server), Duration::from_millis(100)).unwrap();
        let result = fetcher.fetch_products().await;

        assert!(matches!(result, Err(e) if e.is_timeout()));
    }
}
