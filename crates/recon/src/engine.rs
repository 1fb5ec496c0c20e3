use chrono::NaiveDate;

use crate::aggregate::aggregate_spend;
use crate::config::TierConfig;
use crate::merge::{build_report, dedup_contacts, dedup_unpaid, merge_payment_spend};
use crate::model::{RunMeta, TierInput, TierResult};
use crate::summary::build_tier_summary;
use crate::tenure::aggregate_payments;

/// Run the reconciliation and tiering pipeline over pre-loaded input.
///
/// `today` is the reference date for tenure; nothing here reads the clock
/// except the `run_at` stamp in the metadata.
pub fn run(config: &TierConfig, input: &TierInput, today: NaiveDate) -> TierResult {
    let mut stats = input.load_stats.clone();
    stats.payment_events = input.payments.len();

    // Payment events -> per-customer first/last payment + tenure
    let payments = aggregate_payments(&input.payments, today);
    stats.unresolved_events = payments.unresolved;
    stats.payment_customers = payments.facts.len();
    log::info!(
        "payments: {} events, {} unresolved, {} customers",
        stats.payment_events,
        stats.unresolved_events,
        stats.payment_customers
    );

    // Engagement export -> per-customer spend totals
    let spend = aggregate_spend(&input.spend);
    stats.spend_customers = spend.facts.len();
    stats.spend_rows_without_email = spend.without_email;
    stats.unparsed_amounts += spend.overflowed;
    if spend.without_email > 0 {
        log::warn!(
            "{} spend row(s) have no email and are excluded from the report",
            spend.without_email
        );
    }

    // Spend is the authoritative customer list: right join
    let merged = merge_payment_spend(&payments.facts, &spend.facts);
    stats.payment_only_dropped = merged.payment_only.len();
    if !merged.payment_only.is_empty() {
        log::warn!(
            "{} paying customer(s) have no spend record and are excluded from the report",
            merged.payment_only.len()
        );
        for email in &merged.payment_only {
            log::debug!("excluded payment-only customer: {email}");
        }
    }

    let (contacts, duplicate_contacts) = dedup_contacts(&input.contacts);
    let (unpaid, duplicate_unpaid) = dedup_unpaid(&input.unpaid);
    stats.duplicate_contacts = duplicate_contacts;
    stats.duplicate_unpaid = duplicate_unpaid;

    let report = build_report(&merged.merged, &contacts, &unpaid);
    stats.contact_matches = report.contact_matches;
    stats.unpaid_matches = report.unpaid_matches;

    let summary = build_tier_summary(&report.rows, config.output.zero_fill_summary);
    log::info!(
        "report: {} customers, {} with CRM contact, {} with signup details",
        report.rows.len(),
        stats.contact_matches,
        stats.unpaid_matches
    );

    TierResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            reference_date: today,
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        stats,
        summary,
        rows: report.rows,
    }
}
