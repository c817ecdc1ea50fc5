//! Cost ledger repository.
//!
//! Rows are keyed `(tenant_id, batch_index)` and upserted, so a chunk that
//! gets replayed after a false-negative timeout overwrites its own ledger
//! row instead of appending a duplicate.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{CostLedgerRecord, NewCostLedgerEntry};
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{CostEstimate, CostLedgerEntry};
use crate::schema::cost_ledger;

/// Repository for per-chunk cost ledger rows.
#[derive(Clone)]
pub struct DieselLedgerRepository {
    pool: AsyncSqlitePool,
}

impl DieselLedgerRepository {
    /// Create a new ledger repository.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Record the estimate for one successfully persisted chunk.
    pub async fn record(
        &self,
        tenant_id: &str,
        batch_index: u32,
        item_count: usize,
        estimate: &CostEstimate,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        let recorded_at = Utc::now().to_rfc3339();

        diesel::insert_into(cost_ledger::table)
            .values(&NewCostLedgerEntry {
                tenant_id,
                batch_index: batch_index as i32,
                item_count: item_count as i32,
                input_tokens: estimate.input_tokens,
                output_tokens: estimate.output_tokens,
                estimated_cost_usd: estimate.estimated_cost_usd,
                recorded_at: &recorded_at,
            })
            .on_conflict((cost_ledger::tenant_id, cost_ledger::batch_index))
            .do_update()
            .set((
                cost_ledger::item_count.eq(item_count as i32),
                cost_ledger::input_tokens.eq(estimate.input_tokens),
                cost_ledger::output_tokens.eq(estimate.output_tokens),
                cost_ledger::estimated_cost_usd.eq(estimate.estimated_cost_usd),
                cost_ledger::recorded_at.eq(&recorded_at),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// All ledger rows for a tenant, in batch order.
    pub async fn entries_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<CostLedgerEntry>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<CostLedgerRecord> = cost_ledger::table
            .filter(cost_ledger::tenant_id.eq(tenant_id))
            .order(cost_ledger::batch_index.asc())
            .load(&mut conn)
            .await?;

        Ok(records.into_iter().map(record_to_entry).collect())
    }

    /// Sum of estimated cost across all of a tenant's ledger rows.
    pub async fn total_cost(&self, tenant_id: &str) -> Result<f64, DieselError> {
        let entries = self.entries_for_tenant(tenant_id).await?;
        Ok(entries.iter().map(|e| e.estimated_cost_usd).sum())
    }
}

fn record_to_entry(record: CostLedgerRecord) -> CostLedgerEntry {
    CostLedgerEntry {
        tenant_id: record.tenant_id,
        batch_index: record.batch_index as i64,
        item_count: record.item_count as i64,
        input_tokens: record.input_tokens,
        output_tokens: record.output_tokens,
        estimated_cost_usd: record.estimated_cost_usd,
        recorded_at: parse_datetime(&record.recorded_at),
    }
}
