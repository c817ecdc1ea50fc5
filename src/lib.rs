//! taxlens - AI transaction classification and tax research system.
//!
//! Imports a tenant's ledger of financial transactions and classifies each
//! one into a tax category with an LLM - chunk by chunk, resumably, with a
//! durable progress checkpoint, a per-chunk cost ledger, and per-tenant
//! admission control.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod rate_limit;
pub mod repository;
pub mod schema;
pub mod server;
