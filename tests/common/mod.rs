//! Shared helpers for the integration tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use incident_report::{
    api::{build_router, AppState, CorsPolicy},
    models::{Category, Incident, Status},
    service::IncidentManager,
    state::{IncidentStore, InMemoryStore},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// Router over a fresh in-memory store
pub fn test_app() -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (app_with_store(store.clone()), store)
}

pub fn app_with_store(store: Arc<dyn IncidentStore>) -> Router {
    let service = Arc::new(IncidentManager::new(store));
    let cors = CorsPolicy::new(TEST_ORIGIN).unwrap();
    build_router(AppState::new(service).with_cors(cors))
}

/// Incident with a fixed creation time `minutes` after a common base
pub fn incident_at(
    title: &str,
    category: Category,
    status: Status,
    minutes: i64,
) -> Incident {
    let base = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
    let mut incident = Incident::new(
        title.to_string(),
        format!("{} reported on site", title),
        category,
        status,
    );
    incident.created_at = base + Duration::minutes(minutes);
    incident.updated_at = incident.created_at;
    incident
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn send_raw(app: &Router, method: Method, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and the shape of the error body
pub async fn assert_error(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let body = json_body(response).await;
    assert!(body["error"].is_string(), "missing error message: {}", body);
    assert_eq!(body["status"], status.as_u16());
    body
}
