//! Classification pipeline endpoints: start (push driver), step (pull
//! driver), status, and stored-result views.
//!
//! Error detail never leaves the process: opaque failures get a reference
//! id in the response and the full error in the log.

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::models::BusinessContext;
use crate::pipeline::{run_step, start_job, StartError, StepError};
use crate::rate_limit::RateDecision;

use super::super::AppState;

/// Request body for starting a background classification job.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub abn: Option<String>,
    #[serde(default)]
    pub batch_size: Option<u32>,
}

/// Request body for stepping one chunk.
#[derive(Debug, Deserialize)]
pub struct StepRequest {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub batch: Option<u32>,
    #[serde(default)]
    pub batch_size: Option<u32>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub abn: Option<String>,
}

/// Start a push-driver job: validate, price, spawn the background loop.
pub async fn start_classification(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Response {
    if req.tenant_id.trim().is_empty() {
        return client_error("tenant_id is required");
    }
    if let RateDecision::Limited { retry_after } =
        state.rate_limiter.check(&req.tenant_id, "classify:start").await
    {
        return rate_limited(retry_after);
    }

    let context = BusinessContext {
        business_name: req.business_name,
        industry: req.industry,
        abn: req.abn,
    };

    match start_job(
        state.step.clone(),
        state.leases.clone(),
        &req.tenant_id,
        context,
        req.batch_size,
    )
    .await
    {
        Ok(outcome) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "analyzing",
                "total_transactions": outcome.total_transactions,
                "estimated_cost_usd": outcome.estimate.estimated_cost_usd,
                "poll_url": format!("/api/classify/status/{}", req.tenant_id),
            })),
        )
            .into_response(),
        Err(err @ StartError::NoSourceItems(_)) => client_error(&err.to_string()),
        Err(err @ StartError::AlreadyRunning(_)) => {
            (StatusCode::CONFLICT, Json(json!({"success": false, "error": err.to_string()})))
                .into_response()
        }
        Err(StartError::Persistence(err)) => internal_error(err),
    }
}

/// Pull driver: execute exactly one chunk and return control to the caller.
pub async fn step_classification(
    State(state): State<AppState>,
    Json(req): Json<StepRequest>,
) -> Response {
    if req.tenant_id.trim().is_empty() {
        return client_error("tenant_id is required");
    }
    if let RateDecision::Limited { retry_after } =
        state.rate_limiter.check(&req.tenant_id, "classify:step").await
    {
        return rate_limited(retry_after);
    }

    // Serialize steps per tenant; released when the handler returns.
    let _lease = match state.leases.try_acquire(&req.tenant_id) {
        Some(guard) => guard,
        None => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "success": false,
                    "error": format!(
                        "a classification step is already running for tenant {}",
                        req.tenant_id
                    ),
                })),
            )
                .into_response()
        }
    };

    let context = BusinessContext {
        business_name: req.business_name,
        industry: req.industry,
        abn: req.abn,
    };

    match run_step(
        &state.step,
        &req.tenant_id,
        req.batch.unwrap_or(0),
        req.batch_size,
        &context,
        |_, _| {},
    )
    .await
    {
        Ok(outcome) => {
            let cost = outcome.cost.unwrap_or_else(|| crate::pipeline::estimate_chunk_cost(0));
            Json(json!({
                "success": true,
                "analyzed": outcome.analyzed,
                "total_analyzed": outcome.total_analyzed,
                "total_transactions": outcome.total_transactions,
                "has_more": outcome.has_more,
                "next_batch": outcome.next_batch,
                "all_complete": outcome.all_complete,
                "progress": outcome.progress,
                "cost": {
                    "batch_cost_usd": cost.estimated_cost_usd,
                    "input_tokens": cost.input_tokens,
                    "output_tokens": cost.output_tokens,
                },
                "timing": {
                    "analyze_ms": outcome.analyze_ms,
                    "total_ms": outcome.total_ms,
                },
            }))
            .into_response()
        }
        Err(err @ StepError::NoSourceItems(_)) => client_error(&err.to_string()),
        Err(StepError::Classifier(err)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "success": false,
                "error": "classification failed",
                "hint": err.hint(),
            })),
        )
            .into_response(),
        Err(StepError::Persistence(err)) => internal_error(err),
    }
}

/// Job checkpoint for a tenant.
pub async fn job_status(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Response {
    match state.jobs.get(&tenant_id).await {
        Ok(Some(job)) => Json(json!({
            "status": job.status.api_str(),
            "progress": job.progress_percent(),
            "transactions_analyzed": job.processed_count,
            "total_transactions": job.total_items,
            "last_update": job.updated_at.to_rfc3339(),
            "error": job.last_error,
        }))
        .into_response(),
        Ok(None) => Json(json!({
            "status": "idle",
            "progress": 0.0,
            "transactions_analyzed": 0,
            "total_transactions": 0,
            "last_update": serde_json::Value::Null,
            "error": serde_json::Value::Null,
        }))
        .into_response(),
        Err(err) => internal_error(err),
    }
}

/// All stored classification records for a tenant.
pub async fn list_classifications(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Response {
    match state.records.list_for_tenant(&tenant_id).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => internal_error(err),
    }
}

/// Per-category aggregate for a tenant, cached until the next job
/// completion evicts it.
pub async fn classification_summary(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Response {
    if let Some(cached) = state.report_cache.get_summary(&tenant_id) {
        return Json(cached).into_response();
    }

    let categories = match state.records.category_summary(&tenant_id).await {
        Ok(rows) => rows,
        Err(err) => return internal_error(err),
    };
    let total: i64 = categories.iter().map(|c| c.count).sum();
    let deductible: i64 = categories.iter().map(|c| c.deductible_count).sum();

    let summary = json!({
        "tenant_id": tenant_id,
        "total_classified": total,
        "deductible_count": deductible,
        "categories": categories
            .iter()
            .map(|c| json!({
                "category": c.category,
                "count": c.count,
                "deductible_count": c.deductible_count,
            }))
            .collect::<Vec<_>>(),
    });
    state.report_cache.set_summary(&tenant_id, summary.clone());

    Json(summary).into_response()
}

fn client_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "error": message})),
    )
        .into_response()
}

fn rate_limited(retry_after: std::time::Duration) -> Response {
    let secs = retry_after.as_secs().max(1);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "success": false,
            "error": "rate limit exceeded",
            "retry_after_secs": secs,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    response
}

/// Opaque 500: a reference id in the response, the detail in the log.
fn internal_error(err: impl std::fmt::Display) -> Response {
    let reference = Uuid::new_v4();
    tracing::error!("internal error {}: {}", reference, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": "internal error",
            "reference": reference.to_string(),
        })),
    )
        .into_response()
}
