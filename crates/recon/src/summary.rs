use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::classify::{round2, Tier};
use crate::model::{FinalReportRow, TierSummaryRow};

/// Count report rows per tier and compute each tier's share of the total.
///
/// Rows come out in the fixed tier order (VIP first). Tiers with no
/// customers are omitted unless `zero_fill` is set. Percentages are rounded
/// independently and need not sum to exactly 100.
pub fn build_tier_summary(rows: &[FinalReportRow], zero_fill: bool) -> Vec<TierSummaryRow> {
    let mut counts: HashMap<Tier, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.tier).or_insert(0) += 1;
    }
    summarize_counts(&counts, zero_fill)
}

fn summarize_counts(counts: &HashMap<Tier, usize>, zero_fill: bool) -> Vec<TierSummaryRow> {
    let total: usize = counts.values().sum();

    Tier::ORDER
        .iter()
        .filter_map(|tier| {
            let count = counts.get(tier).copied().unwrap_or(0);
            if count == 0 && !zero_fill {
                return None;
            }
            Some(TierSummaryRow {
                tier: *tier,
                count,
                percentage: percentage(count, total),
            })
        })
        .collect()
}

fn percentage(count: usize, total: usize) -> Decimal {
    if total == 0 {
        return round2(Decimal::ZERO);
    }
    round2(Decimal::from(count) / Decimal::from(total) * Decimal::ONE_HUNDRED)
}
