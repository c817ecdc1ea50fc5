//! Push driver: run a whole job as a detached background task.
//!
//! The caller gets control back right after admission and pricing; the loop
//! has no caller to report to, so everything it learns lands on the durable
//! job row (including failures, persisted as status `error`).

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::models::{BusinessContext, CostEstimate};
use crate::repository::DieselError;

use super::cost::estimate_chunk_cost;
use super::lease::TenantLeases;
use super::step::{run_step, StepContext};

/// Immediate result of starting a background job.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub total_transactions: usize,
    pub estimate: CostEstimate,
}

/// How starting a job can fail, before any background work begins.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("no cached transactions for tenant {0} - import transactions first")]
    NoSourceItems(String),
    #[error("a classification run is already in progress for tenant {0}")]
    AlreadyRunning(String),
    #[error("persistence failed: {0}")]
    Persistence(#[from] DieselError),
}

/// Validate, price the whole job, then loop the shared step function in a
/// detached task until the job completes or fails.
pub async fn start_job(
    ctx: Arc<StepContext>,
    leases: Arc<TenantLeases>,
    tenant_id: &str,
    context: BusinessContext,
    batch_size: Option<u32>,
) -> Result<StartOutcome, StartError> {
    let total = ctx.transactions.count_for_tenant(tenant_id).await? as usize;
    if total == 0 {
        return Err(StartError::NoSourceItems(tenant_id.to_string()));
    }

    let guard = leases
        .try_acquire(tenant_id)
        .ok_or_else(|| StartError::AlreadyRunning(tenant_id.to_string()))?;

    let estimate = estimate_chunk_cost(total);
    let tenant = tenant_id.to_string();

    tokio::spawn(async move {
        // The lease lives as long as the loop; overlapping starts and pull
        // steps are rejected until it drops.
        let _lease = guard;
        let mut batch: u32 = 0;

        loop {
            match run_step(&ctx, &tenant, batch, batch_size, &context, |_, _| {}).await {
                Ok(outcome) => {
                    if outcome.all_complete {
                        info!("background classification finished for {}", tenant);
                        break;
                    }
                    batch = outcome.next_batch.unwrap_or(batch + 1);
                }
                Err(err) => {
                    error!("background classification failed for {}: {}", tenant, err);
                    if let Err(mark_err) = ctx.tracker.mark_error(&tenant, &err.to_string()).await
                    {
                        error!("failed to persist error status for {}: {}", tenant, mark_err);
                    }
                    break;
                }
            }
        }
    });

    Ok(StartOutcome {
        total_transactions: total,
        estimate,
    })
}
