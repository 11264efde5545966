//! Router construction for the HTTP API.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::pipeline::Pipeline;

/// Build the full axum router with all routes and request tracing.
pub fn build_router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/search", get(handlers::search))
        .route("/search/all", get(handlers::search_all))
        .route("/company/{number}", get(handlers::company))
        .route("/export", get(handlers::export))
        .route("/import", post(handlers::import))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}
