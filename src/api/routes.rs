use crate::api::{cors, handlers, AppState};
use crate::metrics::MetricsLayer;
use axum::{middleware, routing::get, Router};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

pub const API_PREFIX: &str = "/api/v1";

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let cors_policy = state.cors.clone();

    let incidents = Router::new()
        .route(
            "/incidents",
            get(handlers::list_incidents).post(handlers::create_incident),
        )
        .route(
            "/incidents/:id",
            get(handlers::get_incident)
                .put(handlers::update_incident)
                .delete(handlers::delete_incident),
        );

    Router::new()
        // Operational endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .nest(API_PREFIX, incidents)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(MetricsLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        // Outermost so preflights and errors carry the headers too
        .layer(middleware::from_fn_with_state(cors_policy, cors::apply_cors))
}
