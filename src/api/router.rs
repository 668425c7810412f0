use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::cache;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::resources;
use super::state::AppState;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Cached resources
        .route("/api/{resource}", get(resources::get_resource))
        // Administrative eviction
        .route("/cache/{key}", delete(cache::clear_cache))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Create the application router, exposing Prometheus metrics when enabled
pub fn create_app_router(
    state: AppState,
    metrics: Option<PrometheusMetrics>,
    metrics_path: &str,
) -> Router {
    let router = create_router_with_state(state);

    match metrics {
        Some(metrics) => router.merge(create_metrics_router(metrics, metrics_path)),
        None => router,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use crate::api::middleware::REQUEST_ID_HEADER;
    use crate::domain::product::CountingGenerator;
    use crate::domain::{default_products, DomainError, Product, StaticProductCatalog};
    use crate::domain::ResourceGenerator;
    use crate::infrastructure::cache::{InMemoryCache, TieredCache};
    use crate::infrastructure::services::ResourceCacheService;

    fn app_with(generator: Arc<dyn ResourceGenerator>) -> Router {
        let cache = TieredCache::new(
            Arc::new(InMemoryCache::new()),
            Some(Arc::new(InMemoryCache::new())),
        );
        let service = Arc::new(ResourceCacheService::new(cache, generator));
        create_router_with_state(AppState::new(service))
    }

    fn app() -> Router {
        app_with(Arc::new(StaticProductCatalog::default()))
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn conditional_get(uri: &str, etag: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn etag_of(response: &Response) -> String {
        response
            .headers()
            .get(header::ETAG)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_get_resource_returns_payload_with_validators() {
        let app = app();

        let response = send(&app, get("/api/productlist")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=10, must-revalidate"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let etag = etag_of(&response);
        assert!(etag.starts_with('"') && etag.ends_with('"'));

        let body = body_bytes(response).await;
        let products: Vec<Product> = serde_json::from_slice(&body).unwrap();
        assert_eq!(products, default_products());
    }

    #[tokio::test]
    async fn test_matching_if_none_match_returns_304() {
        let app = app();

        let first = send(&app, get("/api/productlist")).await;
        let etag = etag_of(&first);

        let second = send(&app, conditional_get("/api/productlist", &etag)).await;

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(etag_of(&second), etag);
        assert!(second.headers().get(header::CACHE_CONTROL).is_some());
        assert!(body_bytes(second).await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_if_none_match_returns_full_payload() {
        let app = app();

        let response = send(&app, conditional_get("/api/productlist", "\"stale\"")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_cache_returns_cleared_key() {
        let app = app();

        let response = send(&app, delete("/cache/productlist")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body, serde_json::json!({ "Cleared": "productlist" }));
    }

    #[tokio::test]
    async fn test_delete_unknown_key_succeeds() {
        let app = app();

        let response = send(&app, delete("/cache/does-not-exist")).await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_revalidate_evict_regenerate_scenario() {
        let generator = Arc::new(CountingGenerator::products());
        let app = app_with(generator.clone());

        let first = send(&app, get("/api/productlist")).await;
        assert_eq!(first.status(), StatusCode::OK);
        let etag = etag_of(&first);
        let first_body = body_bytes(first).await;

        let second = send(&app, conditional_get("/api/productlist", &etag)).await;
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(generator.calls(), 1);

        let evicted = send(&app, delete("/cache/productlist")).await;
        assert_eq!(evicted.status(), StatusCode::OK);

        let third = send(&app, get("/api/productlist")).await;
        assert_eq!(third.status(), StatusCode::OK);
        assert_eq!(etag_of(&third), etag);
        assert_eq!(body_bytes(third).await, first_body);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_resource_is_404() {
        let app = app();

        let response = send(&app, get("/api/orders")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["type"], "not_found_error");
    }

    #[tokio::test]
    async fn test_generation_failure_is_502() {
        let generator = Arc::new(
            CountingGenerator::products().with_error(DomainError::upstream("catalog down")),
        );
        let app = app_with(generator);

        let response = send(&app, get("/api/productlist")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get(header::ETAG).is_none());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let app = app();

        let request = Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app();

        for uri in ["/health", "/live", "/ready"] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_ready_reports_degraded_shared_tier() {
        use crate::domain::cache::MockCache;

        let cache = TieredCache::new(
            Arc::new(MockCache::new()),
            Some(Arc::new(MockCache::new().with_error("connection refused"))),
        );
        let service = Arc::new(ResourceCacheService::new(
            cache,
            Arc::new(StaticProductCatalog::default()),
        ));
        let app = create_router_with_state(AppState::new(service));

        let response = send(&app, get("/ready")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"][0]["name"], "shared_cache");
    }

    #[tokio::test]
    async fn test_cors_preflight_is_allowed() {
        let app = app();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/productlist")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;

        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
