//! Cost accounting models for the classification ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token and dollar estimate for a batch of classifier calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub estimated_cost_usd: f64,
}

/// One ledger row per successfully persisted chunk, keyed by
/// `(tenant_id, batch_index)` so a replayed chunk overwrites its own row
/// instead of double-billing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLedgerEntry {
    pub tenant_id: String,
    pub batch_index: i64,
    pub item_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub estimated_cost_usd: f64,
    pub recorded_at: DateTime<Utc>,
}
