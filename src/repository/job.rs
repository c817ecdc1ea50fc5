//! Job checkpoint repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{JobRecord, NewJob};
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{ClassificationJob, JobStatus};
use crate::schema::classification_jobs;

/// Repository for the per-tenant job checkpoint row.
#[derive(Clone)]
pub struct DieselJobRepository {
    pool: AsyncSqlitePool,
}

impl DieselJobRepository {
    /// Create a new job repository.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get the checkpoint for a tenant, if one exists.
    pub async fn get(&self, tenant_id: &str) -> Result<Option<ClassificationJob>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<JobRecord> = classification_jobs::table
            .filter(classification_jobs::tenant_id.eq(tenant_id))
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.map(record_to_job))
    }

    /// Upsert the checkpoint row. `created_at` is preserved from the model
    /// on first insert and never overwritten afterwards.
    pub async fn upsert(&self, job: &ClassificationJob) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        let created_at = job.created_at.to_rfc3339();
        let updated_at = job.updated_at.to_rfc3339();

        diesel::insert_into(classification_jobs::table)
            .values(&NewJob {
                tenant_id: &job.tenant_id,
                status: job.status.as_str(),
                total_items: job.total_items as i32,
                processed_count: job.processed_count as i32,
                last_error: job.last_error.as_deref(),
                created_at: &created_at,
                updated_at: &updated_at,
            })
            .on_conflict(classification_jobs::tenant_id)
            .do_update()
            .set((
                classification_jobs::status.eq(job.status.as_str()),
                classification_jobs::total_items.eq(job.total_items as i32),
                classification_jobs::processed_count.eq(job.processed_count as i32),
                classification_jobs::last_error.eq(job.last_error.as_deref()),
                classification_jobs::updated_at.eq(&updated_at),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}

fn record_to_job(record: JobRecord) -> ClassificationJob {
    ClassificationJob {
        tenant_id: record.tenant_id,
        status: JobStatus::from_str(&record.status).unwrap_or(JobStatus::Idle),
        total_items: record.total_items as i64,
        processed_count: record.processed_count as i64,
        last_error: record.last_error,
        created_at: parse_datetime(&record.created_at),
        updated_at: parse_datetime(&record.updated_at),
    }
}
