//! LLM-backed transaction classification.
//!
//! [`LlmClassifier`] speaks to an Ollama-compatible inference endpoint;
//! [`classify_chunk`] fans a chunk of transactions out over a bounded pool
//! of concurrent calls. The [`TransactionClassifier`] trait is the seam the
//! pipeline depends on, so tests can substitute a stub.

mod client;
mod invoker;

pub use client::{ClassifierConfig, LlmClassifier, DEFAULT_CLASSIFY_PROMPT};
pub use invoker::{classify_chunk, DEFAULT_CLASSIFY_CONCURRENCY};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{BusinessContext, Classification, SourceTransaction};

/// Failure class of a classifier call, assigned where the upstream exchange
/// happens so callers can map failures to stable hints without matching on
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierErrorKind {
    /// Authentication or authorization rejected by the upstream service.
    Credential,
    /// Upstream quota or rate limit exhausted.
    Quota,
    /// The configured model is not available on the endpoint.
    ModelUnavailable,
    /// Connection failure, timeout, or 5xx response.
    Transient,
    /// The service answered but the payload could not be parsed.
    InvalidResponse,
}

impl ClassifierErrorKind {
    /// Stable, user-facing hint for this failure class.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Credential => "check the classifier endpoint credentials",
            Self::Quota => "classifier quota exhausted - retry the same batch later",
            Self::ModelUnavailable => "the configured model is not available on the endpoint",
            Self::Transient => "temporary classifier failure - retry the same batch",
            Self::InvalidResponse => "the classifier returned an unparseable answer",
        }
    }
}

/// Error from a classifier call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClassifierError {
    pub kind: ClassifierErrorKind,
    pub message: String,
}

impl ClassifierError {
    pub fn new(kind: ClassifierErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Stable hint derived from the error kind.
    pub fn hint(&self) -> &'static str {
        self.kind.hint()
    }
}

/// Classifies a single transaction.
///
/// The seam between the pipeline and the external service; production uses
/// [`LlmClassifier`].
#[async_trait]
pub trait TransactionClassifier: Send + Sync {
    /// Classify one transaction in the given business context.
    async fn classify(
        &self,
        txn: &SourceTransaction,
        context: &BusinessContext,
    ) -> Result<Classification, ClassifierError>;

    /// Model identifier recorded on persisted rows.
    fn model_name(&self) -> &str;
}
