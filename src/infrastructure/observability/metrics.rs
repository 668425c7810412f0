//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;
use crate::domain::CacheTier;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("catalog_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Outcome of one generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success,
    Failure,
    Timeout,
}

impl GenerationOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            GenerationOutcome::Success => "success",
            GenerationOutcome::Failure => "failure",
            GenerationOutcome::Timeout => "timeout",
        }
    }
}

/// What a coalesced run was doing, so server generations and client loads are counted apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightSource {
    /// Server-side generation of a cached resource
    Generation,
    /// Caller-side load of the product listing
    ClientLoad,
}

impl FlightSource {
    fn as_str(&self) -> &'static str {
        match self {
            FlightSource::Generation => "generation",
            FlightSource::ClientLoad => "client_load",
        }
    }

    /// Leading word of the log line for a finished run
    pub fn label(&self) -> &'static str {
        match self {
            FlightSource::Generation => "Generation",
            FlightSource::ClientLoad => "Client load",
        }
    }
}

pub fn record_cache_hit(tier: CacheTier) {
    counter!("cache_hits_total", "tier" => tier.as_str()).increment(1);
}

pub fn record_cache_miss() {
    counter!("cache_misses_total").increment(1);
}

/// Shared-tier failures are absorbed (fail-open); this is their only trace besides logs
pub fn record_shared_tier_error(op: &'static str) {
    counter!("cache_shared_tier_errors_total", "op" => op).increment(1);
}

pub fn record_generation(source: FlightSource, outcome: GenerationOutcome, duration: Duration) {
    counter!(
        "cache_generations_total",
        "source" => source.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("cache_generation_duration_seconds", "source" => source.as_str())
        .record(duration.as_secs_f64());
}

/// A caller joined a generation already in flight
pub fn record_coalesced_wait() {
    counter!("cache_coalesced_waits_total").increment(1);
}

pub fn record_eviction() {
    counter!("cache_evictions_total").increment(1);
}
