//! Record merging: payment facts onto spend facts, then CRM contacts and
//! unpaid signups onto the result, with phone reconciliation.

use std::collections::{HashMap, HashSet};

use crate::classify::{amount_per_month, classify_tier};
use crate::model::{
    ContactRecord, CustomerPaymentFacts, CustomerSpendFacts, FinalReportRow, MergedPaymentRecord,
    UnpaidSignupRecord,
};

/// Values treated as "no value" after trimming.
const EMPTY_SENTINELS: [&str; 5] = ["", "none", "None", "nan", "NaN"];

#[derive(Debug, Default)]
pub struct PaymentSpendMerge {
    /// One row per spend customer, in spend order.
    pub merged: Vec<MergedPaymentRecord>,
    /// Emails with payment history but no spend record. Not in `merged`.
    pub payment_only: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ReportMerge {
    pub rows: Vec<FinalReportRow>,
    pub contact_matches: usize,
    pub unpaid_matches: usize,
}

/// Right join of payment facts onto spend facts by email.
///
/// Every spend customer is kept; a missing payment history means tenure 0
/// and no dates. Spend rate and tier are computed here.
pub fn merge_payment_spend(
    payments: &[CustomerPaymentFacts],
    spend: &[CustomerSpendFacts],
) -> PaymentSpendMerge {
    let by_email: HashMap<&str, &CustomerPaymentFacts> =
        payments.iter().map(|p| (p.email.as_str(), p)).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(spend.len());

    for s in spend {
        if !seen.insert(s.email.as_str()) {
            continue;
        }
        let facts = by_email.get(s.email.as_str());
        let duration_months = facts.map_or(0, |f| f.duration_months);
        let rate = amount_per_month(s.amount_all_time, duration_months);

        merged.push(MergedPaymentRecord {
            email: s.email.clone(),
            first_payment_date: facts.and_then(|f| f.first_payment_date),
            last_payment_date: facts.and_then(|f| f.last_payment_date),
            duration_months,
            amount_all_time: s.amount_all_time,
            amount_year: s.amount_year,
            amount_month: s.amount_month,
            workspace: s.workspace.clone(),
            amount_per_month: rate,
            tier: classify_tier(duration_months, rate),
        });
    }

    let payment_only = payments
        .iter()
        .filter(|p| !seen.contains(p.email.as_str()))
        .map(|p| p.email.clone())
        .collect();

    PaymentSpendMerge {
        merged,
        payment_only,
    }
}

/// Keep the first contact per (trimmed) email. Returns the kept records and
/// the number of duplicates collapsed. Contacts without an email are dropped.
pub fn dedup_contacts(contacts: &[ContactRecord]) -> (Vec<ContactRecord>, usize) {
    dedup_by_email(contacts, |c| c.email.as_str(), |c, email| ContactRecord {
        email,
        ..c.clone()
    })
}

/// Keep the first unpaid-signup record per (trimmed) email.
pub fn dedup_unpaid(records: &[UnpaidSignupRecord]) -> (Vec<UnpaidSignupRecord>, usize) {
    dedup_by_email(records, |r| r.email.as_str(), |r, email| UnpaidSignupRecord {
        email,
        ..r.clone()
    })
}

fn dedup_by_email<T>(
    records: &[T],
    email_of: impl Fn(&T) -> &str,
    with_email: impl Fn(&T, String) -> T,
) -> (Vec<T>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::new();
    let mut duplicates = 0;

    for record in records {
        let email = email_of(record).trim();
        if email.is_empty() {
            continue;
        }
        if seen.insert(email.to_string()) {
            kept.push(with_email(record, email.to_string()));
        } else {
            duplicates += 1;
        }
    }

    (kept, duplicates)
}

/// Trim a raw field and map the empty sentinels (`""`, `undefined` in any
/// case, `none`/`None`, `nan`/`NaN`) to `None`.
pub fn clean_field(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if EMPTY_SENTINELS.contains(&trimmed) || trimmed.eq_ignore_ascii_case("undefined") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Cleaned `primary` if present, else cleaned `fallback`.
pub fn reconcile(primary: Option<&str>, fallback: Option<&str>) -> Option<String> {
    clean_field(primary).or_else(|| clean_field(fallback))
}

/// Left-join contacts and unpaid signups onto merged payment records and
/// produce the final report rows.
///
/// Both right-hand sets must already be deduplicated by email; a repeated
/// email on the left is collapsed to its first occurrence. CRM phone fields
/// take priority over the unpaid-signup ones.
pub fn build_report(
    merged: &[MergedPaymentRecord],
    contacts: &[ContactRecord],
    unpaid: &[UnpaidSignupRecord],
) -> ReportMerge {
    let contacts_by_email: HashMap<&str, &ContactRecord> =
        contacts.iter().map(|c| (c.email.as_str(), c)).collect();
    let unpaid_by_email: HashMap<&str, &UnpaidSignupRecord> =
        unpaid.iter().map(|u| (u.email.as_str(), u)).collect();

    let mut out = ReportMerge::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for record in merged {
        if !seen.insert(record.email.as_str()) {
            continue;
        }

        let contact = contacts_by_email.get(record.email.as_str()).copied();
        let signup = unpaid_by_email.get(record.email.as_str()).copied();
        if contact.is_some() {
            out.contact_matches += 1;
        }
        if signup.is_some() {
            out.unpaid_matches += 1;
        }

        let phone_number = reconcile(
            contact.and_then(|c| c.phone.as_deref()),
            signup.and_then(|u| u.phone_number.as_deref()),
        );
        let phone_country = reconcile(
            contact.and_then(|c| c.phone_country.as_deref()),
            signup.and_then(|u| u.phone_number_country.as_deref()),
        );

        out.rows.push(FinalReportRow {
            email: record.email.clone(),
            full_name: contact.and_then(|c| c.full_name.clone()),
            first_name: contact.and_then(|c| c.first_name.clone()),
            last_name: contact.and_then(|c| c.last_name.clone()),
            phone_number,
            phone_country,
            first_payment_date: record.first_payment_date,
            last_payment_date: record.last_payment_date,
            duration_months: record.duration_months,
            amount_all_time: record.amount_all_time,
            amount_year: record.amount_year,
            amount_month: record.amount_month,
            workspace: record.workspace.clone(),
            amount_per_month: record.amount_per_month,
            tier: record.tier,
        });
    }

    out
}
