//! Classification job checkpoint models.
//!
//! One row per tenant survives between invocations and carries the cursor
//! (`processed_count`) plus the job state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable state of a tenant's classification job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// No chunk has been processed yet.
    Idle,
    /// At least one chunk done, more remain.
    Syncing,
    /// All transactions classified. Terminal.
    Complete,
    /// A background run failed; `last_error` holds the summary.
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "syncing" => Some(Self::Syncing),
            "complete" => Some(Self::Complete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Status string surfaced by the HTTP API; `syncing` is shown to
    /// callers as `analyzing`.
    pub fn api_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "analyzing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Terminal states accept no further cursor advances.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// The checkpoint row for one tenant's classification job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationJob {
    pub tenant_id: String,
    pub status: JobStatus,
    /// Count of source transactions visible when the job advanced last.
    pub total_items: i64,
    /// Cursor: how far chunk processing has advanced. Never decreases
    /// across successfully persisted steps.
    pub processed_count: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassificationJob {
    /// Create a fresh job row; created lazily on the first step for a tenant.
    pub fn new(tenant_id: &str, total_items: i64) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: tenant_id.to_string(),
            status: JobStatus::Idle,
            total_items,
            processed_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Percentage complete, rounded to one decimal.
    pub fn progress_percent(&self) -> f64 {
        if self.total_items <= 0 {
            return 0.0;
        }
        let pct = self.processed_count as f64 * 100.0 / self.total_items as f64;
        (pct * 10.0).round() / 10.0
    }

    /// Advance the cursor past a successfully persisted window ending at
    /// `end_index`. The cursor is monotonic: a replayed earlier chunk never
    /// moves it backwards. Reaching `total_items` is the terminal
    /// transition, and the cursor is pinned to the total there even when
    /// key collisions stored fewer distinct records.
    pub fn advance_to(&mut self, end_index: i64) {
        self.processed_count = self.processed_count.max(end_index);
        if self.processed_count >= self.total_items {
            self.processed_count = self.total_items;
            self.status = JobStatus::Complete;
        } else {
            self.status = JobStatus::Syncing;
        }
        self.updated_at = Utc::now();
    }

    /// Pin the job to the terminal state (empty-window replay).
    pub fn force_complete(&mut self) {
        self.processed_count = self.total_items;
        self.status = JobStatus::Complete;
        self.updated_at = Utc::now();
    }

    /// Record a background-run failure without losing the cursor.
    pub fn record_error(&mut self, error: &str) {
        self.status = JobStatus::Error;
        self.last_error = Some(error.to_string());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Idle,
            JobStatus::Syncing,
            JobStatus::Complete,
            JobStatus::Error,
        ] {
            assert_eq!(JobStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::from_str("bogus"), None);
    }

    #[test]
    fn test_api_str_maps_syncing_to_analyzing() {
        assert_eq!(JobStatus::Syncing.api_str(), "analyzing");
        assert_eq!(JobStatus::Complete.api_str(), "complete");
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut job = ClassificationJob::new("t", 60);
        job.advance_to(25);
        assert_eq!(job.processed_count, 25);
        assert_eq!(job.status, JobStatus::Syncing);

        // Replaying an earlier chunk must not move the cursor backwards.
        job.advance_to(25);
        assert_eq!(job.processed_count, 25);

        job.advance_to(50);
        job.advance_to(60);
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.processed_count, 60);
    }

    #[test]
    fn test_force_complete_pins_cursor() {
        let mut job = ClassificationJob::new("t", 10);
        job.advance_to(5);
        job.force_complete();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.processed_count, 10);
    }

    #[test]
    fn test_record_error_keeps_cursor() {
        let mut job = ClassificationJob::new("t", 10);
        job.advance_to(5);
        job.record_error("upstream quota exhausted");
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.processed_count, 5);
        assert!(job.last_error.is_some());
    }

    #[test]
    fn test_progress_percent_rounding() {
        let mut job = ClassificationJob::new("t", 3);
        job.processed_count = 1;
        assert_eq!(job.progress_percent(), 33.3);
        job.processed_count = 2;
        assert_eq!(job.progress_percent(), 66.7);
    }
}
