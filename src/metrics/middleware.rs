//! HTTP middleware for tracking request metrics
//!
//! Records request count, duration and in-flight requests for every route
//! except the excluded ones.

use super::*;
use axum::{
    extract::{MatchedPath, Request},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Path label for requests that hit no route
pub const UNMATCHED_PATH: &str = "unmatched";

/// Tower layer for metrics collection
#[derive(Clone)]
pub struct MetricsLayer {
    excluded_paths: Arc<Vec<String>>,
}

impl MetricsLayer {
    /// Skip the health and metrics endpoints
    pub fn new() -> Self {
        Self::with_excluded_paths(vec!["/health".to_string(), "/metrics".to_string()])
    }

    pub fn with_excluded_paths(paths: Vec<String>) -> Self {
        Self {
            excluded_paths: Arc::new(paths),
        }
    }
}

impl Default for MetricsLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            excluded_paths: self.excluded_paths.clone(),
        }
    }
}

/// Tower service for metrics collection
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    excluded_paths: Arc<Vec<String>>,
}

impl<S> Service<Request> for MetricsService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().to_string();
        // Use the route template so ids do not explode label cardinality
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_PATH.to_string());

        if self.excluded_paths.iter().any(|p| p == &path) {
            return Box::pin(self.inner.call(req));
        }

        HTTP_REQUESTS_IN_FLIGHT.inc();

        let start = Instant::now();
        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;

            HTTP_REQUESTS_IN_FLIGHT.dec();

            if let Ok(response) = &result {
                let status = response.status().as_u16().to_string();

                HTTP_REQUESTS_TOTAL
                    .with_label_values(&[&method, &path, &status])
                    .inc();
                HTTP_REQUEST_DURATION_SECONDS
                    .with_label_values(&[&method, &path])
                    .observe(start.elapsed().as_secs_f64());
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_metrics_middleware() {
        let app = Router::new()
            .route("/sample/:id", get(|| async { "Hello, World!" }))
            .layer(MetricsLayer::new());

        let response = app
            .oneshot(Request::builder().uri("/sample/7").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let value = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/sample/:id", "200"])
            .get();
        assert!(value >= 1.0);
    }

    #[tokio::test]
    async fn test_unmatched_requests_share_one_label() {
        let app = Router::new()
            .route("/known", get(|| async { "OK" }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(MetricsLayer::new());

        for uri in ["/scan/a1", "/scan/b2", "/wp-admin.php"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        let value = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", UNMATCHED_PATH, "404"])
            .get();
        assert!(value >= 3.0);
        assert_eq!(
            HTTP_REQUESTS_TOTAL
                .with_label_values(&["GET", "/scan/a1", "404"])
                .get(),
            0.0
        );
    }

    #[tokio::test]
    async fn test_excluded_paths() {
        let app = Router::new()
            .route("/excluded-route", get(|| async { "OK" }))
            .layer(MetricsLayer::with_excluded_paths(vec![
                "/excluded-route".to_string()
            ]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/excluded-route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let value = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/excluded-route", "200"])
            .get();
        assert_eq!(value, 0.0);
    }
}
