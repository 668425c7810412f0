//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::{MetricsConfig, ObservabilityConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_cache_hit, record_cache_miss,
    record_coalesced_wait, record_eviction, record_generation, record_http_request,
    record_shared_tier_error, FlightSource, GenerationOutcome, PrometheusMetrics,
};
