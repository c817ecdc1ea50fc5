//! Deterministic cost estimation for classifier calls.
//!
//! The estimate is linear in the item count, so the per-chunk ledger rows of
//! a job sum to the same figure as pricing the whole collection at once.

use crate::models::CostEstimate;

/// Estimated prompt tokens per classified transaction.
const INPUT_TOKENS_PER_ITEM: i64 = 260;
/// Estimated completion tokens per classified transaction.
const OUTPUT_TOKENS_PER_ITEM: i64 = 80;
/// USD per million input tokens.
const INPUT_USD_PER_MTOK: f64 = 3.0;
/// USD per million output tokens.
const OUTPUT_USD_PER_MTOK: f64 = 15.0;

/// Price a batch of `item_count` classifier calls.
pub fn estimate_chunk_cost(item_count: usize) -> CostEstimate {
    let input_tokens = item_count as i64 * INPUT_TOKENS_PER_ITEM;
    let output_tokens = item_count as i64 * OUTPUT_TOKENS_PER_ITEM;
    let estimated_cost_usd = input_tokens as f64 / 1_000_000.0 * INPUT_USD_PER_MTOK
        + output_tokens as f64 / 1_000_000.0 * OUTPUT_USD_PER_MTOK;

    CostEstimate {
        input_tokens,
        output_tokens,
        estimated_cost_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_is_deterministic() {
        assert_eq!(estimate_chunk_cost(25), estimate_chunk_cost(25));
    }

    #[test]
    fn test_zero_items_cost_nothing() {
        let estimate = estimate_chunk_cost(0);
        assert_eq!(estimate.input_tokens, 0);
        assert_eq!(estimate.output_tokens, 0);
        assert_eq!(estimate.estimated_cost_usd, 0.0);
    }

    #[test]
    fn test_chunk_estimates_sum_to_whole_job() {
        // 60 items in chunks of 25: 25 + 25 + 10.
        let summed: f64 = [25, 25, 10]
            .iter()
            .map(|&n| estimate_chunk_cost(n).estimated_cost_usd)
            .sum();
        let whole = estimate_chunk_cost(60).estimated_cost_usd;
        assert!((summed - whole).abs() < 1e-9);
    }
}
