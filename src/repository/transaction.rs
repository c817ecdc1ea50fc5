//! Source transaction repository: the cached collection a job runs over.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{NewTransaction, TransactionRecord};
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::SourceTransaction;
use crate::schema::transactions;

/// Repository for imported source transactions.
///
/// Listing is ordered by insertion rowid, which is what gives the chunk
/// planner a stable ordering across every step of a job.
#[derive(Clone)]
pub struct DieselTransactionRepository {
    pool: AsyncSqlitePool,
}

impl DieselTransactionRepository {
    /// Create a new transaction repository.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Import a batch of transactions for a tenant.
    ///
    /// Returns the number of rows written. Financial-year tags are derived
    /// from each transaction date at import time.
    pub async fn import_batch(
        &self,
        tenant_id: &str,
        txns: &[SourceTransaction],
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        for txn in txns {
            let occurred_on = txn.occurred_on.to_string();
            let financial_year = txn.financial_year();
            diesel::insert_into(transactions::table)
                .values(&NewTransaction {
                    tenant_id,
                    txn_id: &txn.txn_id,
                    occurred_on: &occurred_on,
                    description: &txn.description,
                    amount: txn.amount,
                    account: txn.account.as_deref(),
                    contact: txn.contact.as_deref(),
                    financial_year: &financial_year,
                    imported_at: &now,
                })
                .execute(&mut conn)
                .await?;
        }

        Ok(txns.len())
    }

    /// List all transactions for a tenant in stable (insertion) order.
    pub async fn list_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<SourceTransaction>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<TransactionRecord> = transactions::table
            .filter(transactions::tenant_id.eq(tenant_id))
            .order(transactions::id.asc())
            .load(&mut conn)
            .await?;

        Ok(records.into_iter().map(record_to_transaction).collect())
    }

    /// Count transactions for a tenant.
    pub async fn count_for_tenant(&self, tenant_id: &str) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = transactions::table
            .filter(transactions::tenant_id.eq(tenant_id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count as u64)
    }

    /// Remove all imported transactions for a tenant (re-import).
    pub async fn clear_tenant(&self, tenant_id: &str) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::delete(transactions::table.filter(transactions::tenant_id.eq(tenant_id)))
            .execute(&mut conn)
            .await
    }
}

fn record_to_transaction(record: TransactionRecord) -> SourceTransaction {
    SourceTransaction {
        txn_id: record.txn_id,
        occurred_on: NaiveDate::parse_from_str(&record.occurred_on, "%Y-%m-%d")
            .unwrap_or(NaiveDate::MIN),
        description: record.description,
        amount: record.amount,
        account: record.account,
        contact: record.contact,
    }
}
