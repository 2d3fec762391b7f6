use crate::error::{AppError, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Cross-origin headers attached to every response
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(origin: &str) -> Result<Self> {
        let allow_origin = HeaderValue::from_str(origin).map_err(|e| {
            AppError::Configuration(format!("Invalid CORS origin '{}': {}", origin, e))
        })?;

        Ok(Self { allow_origin })
    }

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.allow_origin.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
        }
    }
}

/// Answer preflight requests directly and decorate everything else
pub async fn apply_cors(State(policy): State<CorsPolicy>, req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        policy.apply(response.headers_mut());
        return response;
    }

    let mut response = next.run(req).await;
    policy.apply(response.headers_mut());
    response
}
