//! The shared chunk step executed by both job drivers.
//!
//! Order of durable writes inside one step: classification results, then the
//! cost ledger, then the progress cursor. A crash between classification and
//! persistence loses only classifier spend; the cursor never advances past
//! rows that were not written.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::classifier::{classify_chunk, ClassifierError, TransactionClassifier};
use crate::models::{BusinessContext, ClassificationRecord, CostEstimate, JobStatus};
use crate::repository::{
    DieselClassificationRepository, DieselError, DieselLedgerRepository,
    DieselTransactionRepository,
};

use super::cost::estimate_chunk_cost;
use super::planner::{clamp_batch_size, plan};
use super::progress::ProgressTracker;

/// Fired once per job, on the step that reaches the terminal state.
///
/// Implementations must be idempotent: concurrent replays of a completing
/// step may fire the hook more than once.
pub trait CompletionHook: Send + Sync {
    /// Drop derived views for the tenant; returns the evicted entry count.
    fn invalidate(&self, tenant_id: &str) -> usize;
}

/// Everything a step needs; shared by the pull and push drivers.
pub struct StepContext {
    pub transactions: DieselTransactionRepository,
    pub records: DieselClassificationRepository,
    pub ledger: DieselLedgerRepository,
    pub tracker: ProgressTracker,
    pub classifier: Arc<dyn TransactionClassifier>,
    pub hook: Arc<dyn CompletionHook>,
    /// Concurrent in-flight classifier calls per chunk.
    pub concurrency: usize,
}

/// How a single step can fail. No retries happen inside a step; the caller
/// replays the same batch index, which the planner maps to the same window.
#[derive(Debug, Error)]
pub enum StepError {
    /// The tenant has no imported transactions; nothing to classify.
    #[error("no cached transactions for tenant {0} - import transactions first")]
    NoSourceItems(String),
    /// The classifier failed somewhere in the chunk; nothing was persisted.
    #[error("classification failed: {0}")]
    Classifier(#[from] ClassifierError),
    /// A durable write failed; the chunk's computed results are lost.
    #[error("persistence failed: {0}")]
    Persistence(#[from] DieselError),
}

/// Result of one successful step, with enough data for the caller to decide
/// whether to step again.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub batch_index: u32,
    /// Transactions classified by this step.
    pub analyzed: usize,
    /// The job cursor after this step.
    pub total_analyzed: i64,
    pub total_transactions: usize,
    pub has_more: bool,
    pub next_batch: Option<u32>,
    pub all_complete: bool,
    /// Percent complete, one decimal.
    pub progress: f64,
    /// Cost recorded for this step; `None` for an empty-window replay.
    pub cost: Option<CostEstimate>,
    pub analyze_ms: u64,
    pub total_ms: u64,
}

/// Execute exactly one chunk of a tenant's classification job.
pub async fn run_step(
    ctx: &StepContext,
    tenant_id: &str,
    batch_index: u32,
    batch_size: Option<u32>,
    context: &BusinessContext,
    on_progress: impl Fn(usize, usize) + Sync,
) -> Result<StepOutcome, StepError> {
    let started = Instant::now();

    let items = ctx.transactions.list_for_tenant(tenant_id).await?;
    if items.is_empty() {
        return Err(StepError::NoSourceItems(tenant_id.to_string()));
    }

    let total = items.len();
    let window = plan(total, batch_index, clamp_batch_size(batch_size));

    if window.is_empty() {
        // Replay past the end: pin the checkpoint to the terminal state and
        // report completion without touching the classifier.
        let update = ctx.tracker.force_complete(tenant_id, total).await?;
        if update.completed_now {
            let evicted = ctx.hook.invalidate(tenant_id);
            debug!("evicted {} cached views for {}", evicted, tenant_id);
        }
        return Ok(StepOutcome {
            batch_index,
            analyzed: 0,
            total_analyzed: update.job.processed_count,
            total_transactions: total,
            has_more: false,
            next_batch: None,
            all_complete: true,
            progress: update.job.progress_percent(),
            cost: None,
            analyze_ms: 0,
            total_ms: started.elapsed().as_millis() as u64,
        });
    }

    let chunk = &items[window.start..window.end];

    let analyze_started = Instant::now();
    let classifications = classify_chunk(
        ctx.classifier.as_ref(),
        chunk,
        context,
        ctx.concurrency,
        on_progress,
    )
    .await?;
    let analyze_ms = analyze_started.elapsed().as_millis() as u64;

    let model = ctx.classifier.model_name();
    let records: Vec<ClassificationRecord> = chunk
        .iter()
        .zip(classifications)
        .map(|(txn, classification)| {
            ClassificationRecord::from_parts(tenant_id, txn, classification, model)
        })
        .collect();
    ctx.records.upsert_batch(&records).await?;

    let estimate = estimate_chunk_cost(chunk.len());
    ctx.ledger
        .record(tenant_id, batch_index, chunk.len(), &estimate)
        .await?;

    let update = ctx.tracker.advance(tenant_id, total, window).await?;
    if update.completed_now {
        let evicted = ctx.hook.invalidate(tenant_id);
        info!(
            "classification complete for {} ({} transactions, {} cached views evicted)",
            tenant_id, total, evicted
        );
    }

    let all_complete = update.job.status == JobStatus::Complete;
    Ok(StepOutcome {
        batch_index,
        analyzed: chunk.len(),
        total_analyzed: update.job.processed_count,
        total_transactions: total,
        has_more: !all_complete,
        next_batch: if all_complete {
            None
        } else {
            Some(batch_index + 1)
        },
        all_complete,
        progress: update.job.progress_percent(),
        cost: Some(estimate),
        analyze_ms,
        total_ms: started.elapsed().as_millis() as u64,
    })
}
