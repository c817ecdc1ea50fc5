//! Domain models for transactions, classifications, and job tracking.

mod classification;
mod cost;
mod job;
mod transaction;

pub use classification::{BusinessContext, Classification, ClassificationRecord};
pub use cost::{CostEstimate, CostLedgerEntry};
pub use job::{ClassificationJob, JobStatus};
pub use transaction::{financial_year_for, SourceTransaction};
