//! Spend aggregation: per-customer totals from the engagement export.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::model::{CustomerSpendFacts, SpendRow};

/// Result of reducing spend rows to per-customer totals.
#[derive(Debug, Clone, Default)]
pub struct SpendAggregation {
    /// One row per email, ordered by email.
    pub facts: Vec<CustomerSpendFacts>,
    /// Rows with a missing or blank email.
    pub without_email: usize,
    /// Amounts left out of a sum because adding them would overflow.
    pub overflowed: usize,
}

/// Add `amount` into `total`. An overflowing amount is left out and counted.
fn add_amount(total: &mut Decimal, amount: Decimal, email: &str, overflowed: &mut usize) {
    match total.checked_add(amount) {
        Some(sum) => *total = sum,
        None => {
            log::debug!("spend for {email}: amount {amount} overflows the running total, counted as 0");
            *overflowed += 1;
        }
    }
}

/// Group spend rows by email, sum each amount independently, keep the first
/// non-empty workspace seen.
///
/// Rows without an email are skipped and counted. Output is ordered by
/// email. The workspace pick depends on input row order.
pub fn aggregate_spend(rows: &[SpendRow]) -> SpendAggregation {
    let mut groups: BTreeMap<&str, (Decimal, Decimal, Decimal, Option<&str>)> = BTreeMap::new();
    let mut without_email = 0;
    let mut overflowed = 0;

    for row in rows {
        let Some(email) = row.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
            without_email += 1;
            continue;
        };
        let entry = groups
            .entry(email)
            .or_insert((Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, None));
        add_amount(&mut entry.0, row.amount_all_time, email, &mut overflowed);
        add_amount(&mut entry.1, row.amount_year, email, &mut overflowed);
        add_amount(&mut entry.2, row.amount_month, email, &mut overflowed);
        if entry.3.is_none() {
            entry.3 = row.workspace.as_deref().filter(|w| !w.trim().is_empty());
        }
    }

    let facts = groups
        .into_iter()
        .map(|(email, (all_time, year, month, workspace))| CustomerSpendFacts {
            email: email.to_string(),
            amount_all_time: all_time,
            amount_year: year,
            amount_month: month,
            workspace: workspace.map(str::to_string),
        })
        .collect();

    SpendAggregation {
        facts,
        without_email,
        overflowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(email: &str, all: Decimal, year: Decimal, month: Decimal, ws: Option<&str>) -> SpendRow {
        SpendRow {
            email: Some(email.into()),
            amount_all_time: all,
            amount_year: year,
            amount_month: month,
            workspace: ws.map(String::from),
        }
    }

    #[test]
    fn duplicates_are_summed_per_field() {
        let rows = vec![
            row("a@x.com", dec!(100), dec!(40), dec!(10), Some("Acme")),
            row("a@x.com", dec!(50.5), dec!(0), dec!(5), Some("Other")),
        ];
        let facts = aggregate_spend(&rows).facts;
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].amount_all_time, dec!(150.5));
        assert_eq!(facts[0].amount_year, dec!(40));
        assert_eq!(facts[0].amount_month, dec!(15));
        assert_eq!(facts[0].workspace.as_deref(), Some("Acme"));
    }

    #[test]
    fn first_non_empty_workspace_wins() {
        let rows = vec![
            row("a@x.com", dec!(1), dec!(0), dec!(0), None),
            row("a@x.com", dec!(1), dec!(0), dec!(0), Some("  ")),
            row("a@x.com", dec!(1), dec!(0), dec!(0), Some("Beta")),
            row("a@x.com", dec!(1), dec!(0), dec!(0), Some("Gamma")),
        ];
        let facts = aggregate_spend(&rows).facts;
        assert_eq!(facts[0].workspace.as_deref(), Some("Beta"));
        assert_eq!(facts[0].amount_all_time, dec!(4));
    }

    #[test]
    fn rows_without_email_are_counted_and_output_sorted() {
        let rows = vec![
            row("z@x.com", dec!(1), dec!(1), dec!(1), None),
            SpendRow::default(),
            row("  ", dec!(9), dec!(9), dec!(9), None),
            row("b@x.com", dec!(2), dec!(2), dec!(2), None),
        ];
        let agg = aggregate_spend(&rows);
        let emails: Vec<_> = agg.facts.iter().map(|f| f.email.as_str()).collect();
        assert_eq!(emails, vec!["b@x.com", "z@x.com"]);
        assert_eq!(agg.without_email, 2);
        assert_eq!(agg.overflowed, 0);
    }

    #[test]
    fn overflowing_amount_is_left_out_and_counted() {
        let rows = vec![
            row("a@x.com", Decimal::MAX, dec!(5), dec!(0), None),
            row("a@x.com", dec!(1), dec!(5), dec!(0), None),
            row("b@x.com", dec!(3), dec!(0), dec!(0), None),
        ];
        let agg = aggregate_spend(&rows);
        assert_eq!(agg.facts[0].amount_all_time, Decimal::MAX);
        assert_eq!(agg.facts[0].amount_year, dec!(10));
        assert_eq!(agg.facts[1].amount_all_time, dec!(3));
        assert_eq!(agg.overflowed, 1);
    }
}
