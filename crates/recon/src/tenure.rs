//! Temporal aggregation: first/last payment per customer and tenure in months.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::identity::resolve_email;
use crate::model::{CustomerPaymentFacts, PaymentEvent};

/// Result of reducing payment events to per-customer facts.
#[derive(Debug, Clone, Default)]
pub struct PaymentAggregation {
    /// One row per resolved email, ordered by email.
    pub facts: Vec<CustomerPaymentFacts>,
    /// Events where no candidate field looked like an email.
    pub unresolved: usize,
}

/// Parse a payment timestamp into its calendar date.
///
/// Accepts epoch seconds (integer or fractional, read as UTC) and ISO-like
/// datetimes. Offsets are ignored: the wall-clock date is kept.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive());
    }
    if let Ok(secs) = raw.parse::<f64>() {
        if !secs.is_finite() {
            return None;
        }
        return DateTime::from_timestamp(secs.floor() as i64, 0).map(|dt| dt.date_naive());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().date());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Tenure in months since `first`, measured at `today`.
///
/// Uses the 30-day approximation for partial months and rounds up:
/// `ceil(years*12 + months + days/30)`. A missing first payment gives 0,
/// and a first payment after `today` clamps to 0.
pub fn duration_months(first: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(first) = first else {
        return 0;
    };

    let delta_years = i64::from(today.year() - first.year());
    let delta_months = i64::from(today.month()) - i64::from(first.month());
    let delta_days = i64::from(today.day()) - i64::from(first.day());

    // ceil((whole_months * 30 + days) / 30) in integer arithmetic
    let thirtieths = (delta_years * 12 + delta_months) * 30 + delta_days;
    let mut months = thirtieths.div_euclid(30);
    if thirtieths.rem_euclid(30) != 0 {
        months += 1;
    }

    u32::try_from(months.max(0)).unwrap_or(u32::MAX)
}

/// Group events by resolved email and compute first/last payment and tenure.
///
/// Events with a resolved email but no parseable date still create the
/// customer; if none of its events has a date, both dates stay `None` and
/// the tenure is 0.
pub fn aggregate_payments(events: &[PaymentEvent], today: NaiveDate) -> PaymentAggregation {
    let mut groups: BTreeMap<String, (Option<NaiveDate>, Option<NaiveDate>)> = BTreeMap::new();
    let mut unresolved = 0;

    for event in events {
        let Some(email) = resolve_email(event) else {
            unresolved += 1;
            continue;
        };
        let entry = groups.entry(email).or_insert((None, None));
        if let Some(date) = event.date {
            entry.0 = Some(entry.0.map_or(date, |d| d.min(date)));
            entry.1 = Some(entry.1.map_or(date, |d| d.max(date)));
        }
    }

    let facts = groups
        .into_iter()
        .map(|(email, (first, last))| CustomerPaymentFacts {
            email,
            first_payment_date: first,
            last_payment_date: last,
            duration_months: duration_months(first, today),
        })
        .collect();

    PaymentAggregation { facts, unresolved }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn paid(email: &str, date: &str) -> PaymentEvent {
        PaymentEvent {
            date: Some(d(date)),
            primary_email: Some(email.into()),
            ..Default::default()
        }
    }

    #[test]
    fn parse_epoch_seconds() {
        // 2025-08-01T10:00:00Z
        assert_eq!(parse_event_date("1754042400"), Some(d("2025-08-01")));
        assert_eq!(parse_event_date("1754042400.75"), Some(d("2025-08-01")));
    }

    #[test]
    fn parse_iso_forms() {
        assert_eq!(parse_event_date("2025-08-01T23:30:00"), Some(d("2025-08-01")));
        assert_eq!(parse_event_date("2025-08-01 23:30:00.123"), Some(d("2025-08-01")));
        assert_eq!(parse_event_date("2025-08-01T23:30:00+05:00"), Some(d("2025-08-01")));
        assert_eq!(parse_event_date("2025-08-01"), Some(d("2025-08-01")));
    }

    #[test]
    fn parse_garbage_is_none() {
        assert_eq!(parse_event_date(""), None);
        assert_eq!(parse_event_date("yesterday"), None);
        assert_eq!(parse_event_date("NaN"), None);
    }

    #[test]
    fn duration_exact_months() {
        let today = d("2026-10-19");
        assert_eq!(duration_months(Some(d("2026-04-19")), today), 6);
        assert_eq!(duration_months(Some(d("2024-10-19")), today), 24);
        assert_eq!(duration_months(Some(d("2026-10-19")), today), 0);
    }

    #[test]
    fn duration_partial_month_rounds_up() {
        let today = d("2026-10-19");
        // 5 months + 1 day -> 5.033 -> 6
        assert_eq!(duration_months(Some(d("2026-05-18")), today), 6);
        // 6 months - 1 day -> 5.967 -> 6
        assert_eq!(duration_months(Some(d("2026-04-20")), today), 6);
        // 1 day old -> 1
        assert_eq!(duration_months(Some(d("2026-10-18")), today), 1);
    }

    #[test]
    fn duration_uses_thirty_day_divisor_not_calendar() {
        // Jan 31 -> Mar 1: 2 months - 30 days = exactly 1.0 -> 1
        assert_eq!(duration_months(Some(d("2026-01-31")), d("2026-03-01")), 1);
        // Feb 28 -> Mar 31: 1 month + 3 days -> 1.1 -> 2
        assert_eq!(duration_months(Some(d("2026-02-28")), d("2026-03-31")), 2);
    }

    #[test]
    fn duration_missing_or_future_is_zero() {
        let today = d("2026-10-19");
        assert_eq!(duration_months(None, today), 0);
        assert_eq!(duration_months(Some(d("2027-01-01")), today), 0);
    }

    #[test]
    fn aggregate_first_last_and_duration() {
        let today = d("2026-10-19");
        let events = vec![
            paid("b@x.com", "2026-03-10"),
            paid("a@x.com", "2026-04-19"),
            paid("a@x.com", "2026-09-01"),
            paid("a@x.com", "2026-05-02"),
            PaymentEvent {
                distinct_id: Some("anon".into()),
                ..paid("ignored", "2026-01-01")
            },
        ];
        let agg = aggregate_payments(&events, today);

        assert_eq!(agg.unresolved, 1);
        assert_eq!(agg.facts.len(), 2);
        assert_eq!(agg.facts[0].email, "a@x.com");
        assert_eq!(agg.facts[0].first_payment_date, Some(d("2026-04-19")));
        assert_eq!(agg.facts[0].last_payment_date, Some(d("2026-09-01")));
        assert_eq!(agg.facts[0].duration_months, 6);
        assert_eq!(agg.facts[1].email, "b@x.com");
        assert!(agg.facts[1].last_payment_date >= agg.facts[1].first_payment_date);
    }

    #[test]
    fn aggregate_customer_without_dates_has_zero_tenure() {
        let events = vec![PaymentEvent {
            date: None,
            primary_email: Some("a@x.com".into()),
            ..Default::default()
        }];
        let agg = aggregate_payments(&events, d("2026-10-19"));
        assert_eq!(agg.facts.len(), 1);
        assert_eq!(agg.facts[0].first_payment_date, None);
        assert_eq!(agg.facts[0].last_payment_date, None);
        assert_eq!(agg.facts[0].duration_months, 0);
    }
}
