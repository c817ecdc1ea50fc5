//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Classification pipeline
        .route("/api/classify/start", post(handlers::start_classification))
        .route("/api/classify/step", post(handlers::step_classification))
        .route("/api/classify/status/:tenant_id", get(handlers::job_status))
        // Stored results
        .route(
            "/api/classifications/:tenant_id",
            get(handlers::list_classifications),
        )
        .route(
            "/api/classifications/:tenant_id/summary",
            get(handlers::classification_summary),
        )
        // Health
        .route("/api/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
