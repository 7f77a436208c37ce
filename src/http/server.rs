//! HTTP server hosting the rate limited router.

use axum::middleware::from_fn_with_state;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use super::middleware::{enforce_rate_limit, GateState};
use super::routes::not_found;
use crate::error::{KeygateError, Result};

/// Mount `routes` under `prefix` and put the rate limit in front of everything,
/// including requests that match no route.
///
/// With `cors` enabled, preflights are answered before the rate limit runs and
/// every response, rejections included, carries the CORS headers.
pub fn build_router(gate: GateState, prefix: &str, cors: bool, routes: Router) -> Router {
    let prefix = prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    };
    let router = router
        .fallback(not_found)
        .layer(from_fn_with_state(gate, enforce_rate_limit));

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// HTTP server for the rate limited service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Fully assembled router
    router: Router,
}

impl HttpServer {
    /// Create a new server for an assembled router.
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self { addr, router }
    }

    /// Start the server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending::<()>()).await
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            e
        })?;
        info!(addr = %listener.local_addr()?, "Starting HTTP server");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                KeygateError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::default_routes;
    use crate::ratelimit::{LimitConfig, MockClock, RateGovernor};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderName, Request, StatusCode};
    use axum::routing::get;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    fn test_router(limit: u64, clock: &MockClock) -> (Router, Arc<RateGovernor>) {
        let governor = Arc::new(RateGovernor::new(LimitConfig {
            limit,
            window: Duration::from_secs(60),
            ..LimitConfig::default()
        }));
        let gate = GateState::new(
            governor.clone(),
            Arc::new(clock.clone()),
            HeaderName::from_static("api-key"),
        );
        let routes = default_routes().route("/items", get(|| async { "items" }));
        (build_router(gate, "/api", true, routes), governor)
    }

    fn request(uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = key {
            builder = builder.header("api-key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_returns_400() {
        let clock = MockClock::new(Instant::now());
        let (router, governor) = test_router(10, &clock);

        let response = router.oneshot(request("/api/items", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["message"], "API key is missing");
        assert!(governor.is_empty());
    }

    #[tokio::test]
    async fn test_admitted_request_reaches_handler() {
        let clock = MockClock::new(Instant::now());
        let (router, governor) = test_router(10, &clock);

        let response = router.oneshot(request("/api/items", Some("k1"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"items");
        assert_eq!(governor.usage("k1").unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_quota_exceeded_returns_429_then_recovers() {
        let clock = MockClock::new(Instant::now());
        let (router, _governor) = test_router(2, &clock);

        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(request("/api/items", Some("k1")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = router
            .clone()
            .oneshot(request("/api/items", Some("k1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "61");
        let body = json_body(response).await;
        assert_eq!(body["statusCode"], 429);
        assert_eq!(body["message"], "Too Many Requests");

        // Another caller is unaffected.
        let response = router
            .clone()
            .oneshot(request("/api/items", Some("k2")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        clock.advance(Duration::from_millis(60_001));
        let response = router.oneshot(request("/api/items", Some("k1"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_limit_applies_to_every_route() {
        let clock = MockClock::new(Instant::now());
        let (router, governor) = test_router(10, &clock);

        router
            .clone()
            .oneshot(request("/api/health", Some("k1")))
            .await
            .unwrap();
        let response = router
            .clone()
            .oneshot(request("/api/unknown", Some("k1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router.oneshot(request("/api/unknown", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(governor.usage("k1").unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_health_route() {
        let clock = MockClock::new(Instant::now());
        let (router, _governor) = test_router(10, &clock);

        let response = router.oneshot(request("/api/health", Some("k1"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_root_prefix_merges_routes() {
        let clock = MockClock::new(Instant::now());
        let governor = Arc::new(RateGovernor::default());
        let gate = GateState::new(
            governor,
            Arc::new(clock),
            HeaderName::from_static("api-key"),
        );
        let router = build_router(gate, "/", true, default_routes());

        let response = router.oneshot(request("/health", Some("k1"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let clock = MockClock::new(Instant::now());
        let (router, _governor) = test_router(10, &clock);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = HttpServer::new(addr, router);

        let result = server.serve_with_shutdown(async {}).await;
        assert!(result.is_ok());
    }

    fn cross_origin(request: Request<Body>) -> Request<Body> {
        let (mut parts, body) = request.into_parts();
        parts
            .headers
            .insert(header::ORIGIN, "https://app.example.com".parse().unwrap());
        Request::from_parts(parts, body)
    }

    #[tokio::test]
    async fn test_preflight_skips_rate_limit() {
        let clock = MockClock::new(Instant::now());
        let (router, governor) = test_router(10, &clock);
        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/api/health")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(preflight).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert!(governor.is_empty());
    }

    #[tokio::test]
    async fn test_rejections_carry_cors_headers() {
        let clock = MockClock::new(Instant::now());
        let (router, _governor) = test_router(1, &clock);

        let response = router
            .clone()
            .oneshot(cross_origin(request("/api/items", None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );

        router
            .clone()
            .oneshot(cross_origin(request("/api/items", Some("k1"))))
            .await
            .unwrap();
        let response = router
            .oneshot(cross_origin(request("/api/items", Some("k1"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_EXPOSE_HEADERS));
    }

    #[tokio::test]
    async fn test_cors_disabled_leaves_preflight_to_rate_limit() {
        let clock = MockClock::new(Instant::now());
        let gate = GateState::new(
            Arc::new(RateGovernor::default()),
            Arc::new(clock),
            HeaderName::from_static("api-key"),
        );
        let router = build_router(gate, "/api", false, default_routes());
        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/api/health")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(preflight).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
