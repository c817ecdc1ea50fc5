//! Classification record repository: the idempotent result persister.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use super::models::{ClassificationRecordRow, NewClassificationRecord};
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::ClassificationRecord;
use crate::schema::classification_records;

/// Per-category aggregate for the summary view.
#[derive(diesel::QueryableByName, Debug, Clone)]
pub struct CategorySummary {
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub category: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub count: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub deductible_count: i64,
}

/// Repository for per-transaction classification results.
#[derive(Clone)]
pub struct DieselClassificationRepository {
    pool: AsyncSqlitePool,
}

impl DieselClassificationRepository {
    /// Create a new classification repository.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert a batch of classification results.
    ///
    /// Results are first deduplicated on `(tenant_id, transaction_id)` so
    /// that two items resolving to the same fallback key collapse into a
    /// single write (the later one in chunk order wins) instead of tripping
    /// the uniqueness constraint. Each surviving row is then inserted, or
    /// overwritten if the key already exists; re-persisting the same chunk
    /// changes nothing but `updated_at`. Returns the number of rows written.
    pub async fn upsert_batch(
        &self,
        records: &[ClassificationRecord],
    ) -> Result<usize, DieselError> {
        let mut deduped: HashMap<(&str, &str), &ClassificationRecord> = HashMap::new();
        for record in records {
            deduped.insert(
                (record.tenant_id.as_str(), record.transaction_id.as_str()),
                record,
            );
        }
        if deduped.len() < records.len() {
            warn!(
                "collapsed {} duplicate classification keys in one chunk",
                records.len() - deduped.len()
            );
        }

        let mut conn = self.pool.get().await?;

        for record in deduped.values() {
            let created_at = record.created_at.to_rfc3339();
            let updated_at = record.updated_at.to_rfc3339();
            diesel::insert_into(classification_records::table)
                .values(&NewClassificationRecord {
                    tenant_id: &record.tenant_id,
                    transaction_id: &record.transaction_id,
                    category: &record.category,
                    confidence: record.confidence,
                    deductible: record.deductible as i32,
                    financial_year: &record.financial_year,
                    reasoning: record.reasoning.as_deref(),
                    model: &record.model,
                    created_at: &created_at,
                    updated_at: &updated_at,
                })
                .on_conflict((
                    classification_records::tenant_id,
                    classification_records::transaction_id,
                ))
                .do_update()
                .set((
                    classification_records::category.eq(&record.category),
                    classification_records::confidence.eq(record.confidence),
                    classification_records::deductible.eq(record.deductible as i32),
                    classification_records::financial_year.eq(&record.financial_year),
                    classification_records::reasoning.eq(record.reasoning.as_deref()),
                    classification_records::model.eq(&record.model),
                    classification_records::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await?;
        }

        Ok(deduped.len())
    }

    /// Get a single record by its composite key.
    pub async fn get(
        &self,
        tenant_id: &str,
        transaction_id: &str,
    ) -> Result<Option<ClassificationRecord>, DieselError> {
        let mut conn = self.pool.get().await?;

        let row: Option<ClassificationRecordRow> = classification_records::table
            .filter(classification_records::tenant_id.eq(tenant_id))
            .filter(classification_records::transaction_id.eq(transaction_id))
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(row_to_record))
    }

    /// List all records for a tenant, most recently updated first.
    pub async fn list_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<ClassificationRecord>, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<ClassificationRecordRow> = classification_records::table
            .filter(classification_records::tenant_id.eq(tenant_id))
            .order(classification_records::updated_at.desc())
            .load(&mut conn)
            .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Count stored records for a tenant.
    pub async fn count_for_tenant(&self, tenant_id: &str) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = classification_records::table
            .filter(classification_records::tenant_id.eq(tenant_id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count as u64)
    }

    /// Per-category counts for the tenant's summary view.
    pub async fn category_summary(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<CategorySummary>, DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::sql_query(
            "SELECT category, COUNT(*) AS count, SUM(deductible) AS deductible_count \
             FROM classification_records WHERE tenant_id = ? \
             GROUP BY category ORDER BY count DESC, category ASC",
        )
        .bind::<diesel::sql_types::Text, _>(tenant_id)
        .load(&mut conn)
        .await
    }
}

fn row_to_record(row: ClassificationRecordRow) -> ClassificationRecord {
    ClassificationRecord {
        tenant_id: row.tenant_id,
        transaction_id: row.transaction_id,
        category: row.category,
        confidence: row.confidence,
        deductible: row.deductible != 0,
        financial_year: row.financial_year,
        reasoning: row.reasoning,
        model: row.model,
        created_at: parse_datetime(&row.created_at),
        updated_at: parse_datetime(&row.updated_at),
    }
}
