//! Source transaction models for the cached tenant ledger.
//!
//! Transactions are imported once per tenant and iterated in insertion order
//! by the chunk planner, so the cached copy is the stable source collection
//! a classification job runs over.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Key used for transactions that carry no natural identifier.
pub const FALLBACK_TXN_KEY: &str = "unknown";

/// A single financial transaction imported from a tenant's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTransaction {
    /// Natural identifier from the source ledger. May be empty when the
    /// upstream system did not provide one.
    #[serde(default)]
    pub txn_id: String,
    /// Date the transaction occurred.
    pub occurred_on: NaiveDate,
    /// Free-text description or narration line.
    pub description: String,
    /// Signed amount in the tenant's currency.
    pub amount: f64,
    /// Account name or code, if known.
    #[serde(default)]
    pub account: Option<String>,
    /// Counterparty name, if known.
    #[serde(default)]
    pub contact: Option<String>,
}

impl SourceTransaction {
    /// Key under which this transaction's classification is stored.
    ///
    /// Transactions without a natural identifier collapse onto
    /// [`FALLBACK_TXN_KEY`]; the persister merges such collisions into a
    /// single record.
    pub fn classification_key(&self) -> &str {
        if self.txn_id.is_empty() {
            FALLBACK_TXN_KEY
        } else {
            &self.txn_id
        }
    }

    /// Australian financial year tag for this transaction.
    pub fn financial_year(&self) -> String {
        financial_year_for(self.occurred_on)
    }
}

/// Australian financial year for a date.
///
/// The FY boundary is July 1 and the tag names the year the FY ends in:
/// 2023-08-15 falls in "FY2024", 2024-03-01 in "FY2024".
pub fn financial_year_for(date: NaiveDate) -> String {
    let fy_end = if date.month() >= 7 {
        date.year() + 1
    } else {
        date.year()
    };
    format!("FY{}", fy_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_financial_year_boundaries() {
        assert_eq!(financial_year_for(date(2023, 6, 30)), "FY2023");
        assert_eq!(financial_year_for(date(2023, 7, 1)), "FY2024");
        assert_eq!(financial_year_for(date(2023, 12, 31)), "FY2024");
        assert_eq!(financial_year_for(date(2024, 1, 1)), "FY2024");
        assert_eq!(financial_year_for(date(2024, 6, 30)), "FY2024");
    }

    #[test]
    fn test_classification_key_fallback() {
        let mut txn = SourceTransaction {
            txn_id: "INV-001".to_string(),
            occurred_on: date(2024, 2, 10),
            description: "Office supplies".to_string(),
            amount: -42.50,
            account: None,
            contact: None,
        };
        assert_eq!(txn.classification_key(), "INV-001");

        txn.txn_id = String::new();
        assert_eq!(txn.classification_key(), FALLBACK_TXN_KEY);
    }

    #[test]
    fn test_deserialize_minimal() {
        let txn: SourceTransaction = serde_json::from_str(
            r#"{"occurred_on": "2024-02-10", "description": "Taxi", "amount": -35.0}"#,
        )
        .unwrap();
        assert!(txn.txn_id.is_empty());
        assert_eq!(txn.financial_year(), "FY2024");
    }
}
