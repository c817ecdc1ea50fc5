//! Durable job progress tracking.
//!
//! The tracker is the only writer of the checkpoint row's state machine:
//! `idle -> syncing -> complete`, with `error` persisted for background
//! failures. A step that fails leaves the row in its last successful state
//! so the same chunk can simply be retried.

use crate::models::{ClassificationJob, JobStatus};
use crate::repository::{DieselError, DieselJobRepository};

use super::planner::ChunkWindow;

/// Result of advancing the checkpoint.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub job: ClassificationJob,
    /// True when this call performed the transition into `complete`.
    pub completed_now: bool,
}

/// Maintains the durable status record for each tenant's job.
#[derive(Clone)]
pub struct ProgressTracker {
    jobs: DieselJobRepository,
}

impl ProgressTracker {
    pub fn new(jobs: DieselJobRepository) -> Self {
        Self { jobs }
    }

    /// Advance the cursor past a successfully persisted window.
    ///
    /// Creates the job row lazily on the first step. The cursor moves to the
    /// window's end index (never backwards); reaching `total_items` is the
    /// terminal transition and pins the cursor to the total.
    pub async fn advance(
        &self,
        tenant_id: &str,
        total_items: usize,
        window: ChunkWindow,
    ) -> Result<ProgressUpdate, DieselError> {
        let mut job = self
            .jobs
            .get(tenant_id)
            .await?
            .unwrap_or_else(|| ClassificationJob::new(tenant_id, total_items as i64));
        let was_complete = job.status == JobStatus::Complete;

        job.total_items = total_items as i64;
        job.last_error = None;
        job.advance_to(window.end as i64);
        self.jobs.upsert(&job).await?;

        let completed_now = job.status == JobStatus::Complete && !was_complete;
        Ok(ProgressUpdate { job, completed_now })
    }

    /// Pin the job to the terminal state (empty-window replay of a finished
    /// job, or a step whose window starts past the end).
    pub async fn force_complete(
        &self,
        tenant_id: &str,
        total_items: usize,
    ) -> Result<ProgressUpdate, DieselError> {
        let mut job = self
            .jobs
            .get(tenant_id)
            .await?
            .unwrap_or_else(|| ClassificationJob::new(tenant_id, total_items as i64));
        let was_complete = job.status == JobStatus::Complete;

        job.total_items = total_items as i64;
        job.last_error = None;
        job.force_complete();
        self.jobs.upsert(&job).await?;

        Ok(ProgressUpdate {
            job,
            completed_now: !was_complete,
        })
    }

    /// Persist a background-run failure as an explicit `error` status so the
    /// status endpoint can distinguish it from "still running".
    pub async fn mark_error(&self, tenant_id: &str, summary: &str) -> Result<(), DieselError> {
        let mut job = self
            .jobs
            .get(tenant_id)
            .await?
            .unwrap_or_else(|| ClassificationJob::new(tenant_id, 0));
        job.record_error(summary);
        self.jobs.upsert(&job).await
    }

    /// Read the current checkpoint, if any.
    pub async fn get(&self, tenant_id: &str) -> Result<Option<ClassificationJob>, DieselError> {
        self.jobs.get(tenant_id).await
    }
}
