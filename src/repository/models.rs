//! Diesel ORM models for database tables.
//!
//! These models provide compile-time type checking for database operations.
//! Timestamps are stored as RFC 3339 TEXT; boolean flags as INTEGER 0/1.

use diesel::prelude::*;

use crate::schema;

/// Source transaction record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRecord {
    pub id: i32,
    pub tenant_id: String,
    pub txn_id: String,
    pub occurred_on: String,
    pub description: String,
    pub amount: f64,
    pub account: Option<String>,
    pub contact: Option<String>,
    pub financial_year: String,
    pub imported_at: String,
}

/// New source transaction for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::transactions)]
pub struct NewTransaction<'a> {
    pub tenant_id: &'a str,
    pub txn_id: &'a str,
    pub occurred_on: &'a str,
    pub description: &'a str,
    pub amount: f64,
    pub account: Option<&'a str>,
    pub contact: Option<&'a str>,
    pub financial_year: &'a str,
    pub imported_at: &'a str,
}

/// Classification record row from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::classification_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClassificationRecordRow {
    pub id: i32,
    pub tenant_id: String,
    pub transaction_id: String,
    pub category: String,
    pub confidence: f64,
    pub deductible: i32,
    pub financial_year: String,
    pub reasoning: Option<String>,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
}

/// New classification record for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::classification_records)]
pub struct NewClassificationRecord<'a> {
    pub tenant_id: &'a str,
    pub transaction_id: &'a str,
    pub category: &'a str,
    pub confidence: f64,
    pub deductible: i32,
    pub financial_year: &'a str,
    pub reasoning: Option<&'a str>,
    pub model: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Job checkpoint row from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::classification_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRecord {
    pub tenant_id: String,
    pub status: String,
    pub total_items: i32,
    pub processed_count: i32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New job checkpoint for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::classification_jobs)]
pub struct NewJob<'a> {
    pub tenant_id: &'a str,
    pub status: &'a str,
    pub total_items: i32,
    pub processed_count: i32,
    pub last_error: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Cost ledger row from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::cost_ledger)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CostLedgerRecord {
    pub tenant_id: String,
    pub batch_index: i32,
    pub item_count: i32,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub estimated_cost_usd: f64,
    pub recorded_at: String,
}

/// New cost ledger row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::cost_ledger)]
pub struct NewCostLedgerEntry<'a> {
    pub tenant_id: &'a str,
    pub batch_index: i32,
    pub item_count: i32,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub estimated_cost_usd: f64,
    pub recorded_at: &'a str,
}
