//! Database context for managing connections and repository access.
//!
//! Provides a unified entry point for database operations using Diesel ORM.
//! Create one context per command or service, then use it to access all
//! repositories.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::classification::DieselClassificationRepository;
use super::job::DieselJobRepository;
use super::ledger::DieselLedgerRepository;
use super::pool::{AsyncSqlitePool, DieselError};
use super::transaction::DieselTransactionRepository;

/// Database context that manages connections and provides repository access.
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    /// Create a new database context from a SQLite file path.
    pub fn from_path(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    /// Create a new database context from a database URL.
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(database_url),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    /// Get a source transaction repository.
    pub fn transactions(&self) -> DieselTransactionRepository {
        DieselTransactionRepository::new(self.pool.clone())
    }

    /// Get a classification record repository.
    pub fn classifications(&self) -> DieselClassificationRepository {
        DieselClassificationRepository::new(self.pool.clone())
    }

    /// Get a job checkpoint repository.
    pub fn jobs(&self) -> DieselJobRepository {
        DieselJobRepository::new(self.pool.clone())
    }

    /// Get a cost ledger repository.
    pub fn ledger(&self) -> DieselLedgerRepository {
        DieselLedgerRepository::new(self.pool.clone())
    }

    /// Initialize all database schemas.
    ///
    /// Creates the necessary tables and indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(
            r#"
            -- Cached source transactions (the collection the planner windows over)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                txn_id TEXT NOT NULL DEFAULT '',
                occurred_on TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                account TEXT,
                contact TEXT,
                financial_year TEXT NOT NULL,
                imported_at TEXT NOT NULL
            );

            -- Per-transaction classification results, one row per natural key
            CREATE TABLE IF NOT EXISTS classification_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                transaction_id TEXT NOT NULL,
                category TEXT NOT NULL,
                confidence REAL NOT NULL,
                deductible INTEGER NOT NULL DEFAULT 0,
                financial_year TEXT NOT NULL,
                reasoning TEXT,
                model TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(tenant_id, transaction_id)
            );

            -- Job checkpoint, one row per tenant
            CREATE TABLE IF NOT EXISTS classification_jobs (
                tenant_id TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'idle',
                total_items INTEGER NOT NULL DEFAULT 0,
                processed_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Cost ledger, one row per chunk
            CREATE TABLE IF NOT EXISTS cost_ledger (
                tenant_id TEXT NOT NULL,
                batch_index INTEGER NOT NULL,
                item_count INTEGER NOT NULL,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL,
                estimated_cost_usd REAL NOT NULL,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, batch_index)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_transactions_tenant ON transactions(tenant_id);
            CREATE INDEX IF NOT EXISTS idx_records_tenant ON classification_records(tenant_id);
            CREATE INDEX IF NOT EXISTS idx_ledger_tenant ON cost_ledger(tenant_id);
            "#,
        )
        .await
    }

    /// Get list of all tables in the database.
    #[allow(dead_code)]
    pub async fn list_tables(&self) -> Result<Vec<String>, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<TableName> = diesel_async::RunQueryDsl::load(
            diesel::sql_query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            ),
            &mut conn,
        )
        .await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }
}

#[derive(diesel::QueryableByName)]
#[allow(dead_code)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_schema() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));

        ctx.init_schema().await.unwrap();

        let tables = ctx.list_tables().await.unwrap();
        assert!(tables.contains(&"transactions".to_string()));
        assert!(tables.contains(&"classification_records".to_string()));
        assert!(tables.contains(&"classification_jobs".to_string()));
        assert!(tables.contains(&"cost_ledger".to_string()));

        // Idempotent: running again must not fail.
        ctx.init_schema().await.unwrap();
    }
}
