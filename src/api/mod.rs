pub mod cors;
pub mod dto;
pub mod handlers;
pub mod routes;

pub use cors::CorsPolicy;
pub use routes::*;

use crate::service::IncidentService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn IncidentService>,
    pub cors: CorsPolicy,
}

impl AppState {
    pub fn new(service: Arc<dyn IncidentService>) -> Self {
        Self {
            service,
            cors: CorsPolicy::default(),
        }
    }

    /// Set the allowed cross-origin
    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }
}
