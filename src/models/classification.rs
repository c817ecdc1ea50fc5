//! Classification output models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transaction::SourceTransaction;

/// Business profile threaded into the classification prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessContext {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub abn: Option<String>,
}

/// A single classifier verdict for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Lowercase-hyphenated tax category (e.g. "office-expenses").
    pub category: String,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// Whether the transaction looks deductible for the business.
    pub deductible: bool,
    /// One-sentence rationale, if the model provided one.
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Durable per-transaction classification, keyed by
/// `(tenant_id, transaction_id)`. Last write for a key wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub tenant_id: String,
    pub transaction_id: String,
    pub category: String,
    pub confidence: f64,
    pub deductible: bool,
    /// Financial-period tag carried over from the source transaction.
    pub financial_year: String,
    pub reasoning: Option<String>,
    /// Model identifier that produced this verdict.
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassificationRecord {
    /// Build a record from a classifier verdict for one source transaction.
    pub fn from_parts(
        tenant_id: &str,
        txn: &SourceTransaction,
        classification: Classification,
        model: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: tenant_id.to_string(),
            transaction_id: txn.classification_key().to_string(),
            category: classification.category,
            confidence: classification.confidence,
            deductible: classification.deductible,
            financial_year: txn.financial_year(),
            reasoning: classification.reasoning,
            model: model.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_from_parts_uses_fallback_key() {
        let txn = SourceTransaction {
            txn_id: String::new(),
            occurred_on: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
            description: "Unlabelled payment".to_string(),
            amount: -10.0,
            account: None,
            contact: None,
        };
        let record = ClassificationRecord::from_parts(
            "tenant-1",
            &txn,
            Classification {
                category: "other".to_string(),
                confidence: 0.4,
                deductible: false,
                reasoning: None,
            },
            "test-model",
        );
        assert_eq!(record.transaction_id, "unknown");
        assert_eq!(record.financial_year, "FY2024");
        assert_eq!(record.model, "test-model");
    }
}
