//! HTTP endpoint handlers.

mod classify;

pub use classify::{
    classification_summary, job_status, list_classifications, start_classification,
    step_classification,
};

use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}
