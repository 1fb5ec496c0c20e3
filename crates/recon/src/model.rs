use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::classify::Tier;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One raw payment occurrence from the analytics export.
///
/// `date` is the event timestamp already truncated to its calendar date;
/// `None` when the source value was missing or unparseable.
#[derive(Debug, Clone, Default)]
pub struct PaymentEvent {
    pub date: Option<NaiveDate>,
    pub primary_email: Option<String>,
    pub pre_identity_id: Option<String>,
    pub distinct_id: Option<String>,
}

/// One row of the pre-aggregated engagement (spend) export.
#[derive(Debug, Clone, Default)]
pub struct SpendRow {
    pub email: Option<String>,
    pub amount_all_time: Decimal,
    pub amount_year: Decimal,
    pub amount_month: Decimal,
    pub workspace: Option<String>,
}

/// CRM contact keyed by email.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactRecord {
    pub email: String,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub phone_country: Option<String>,
}

/// Unpaid-signup record carrying alternate phone fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnpaidSignupRecord {
    pub email: String,
    pub phone_number: Option<String>,
    pub phone_number_country: Option<String>,
}

/// The four record sets a run consumes, already loaded by collaborators.
#[derive(Debug, Clone, Default)]
pub struct TierInput {
    pub payments: Vec<PaymentEvent>,
    pub spend: Vec<SpendRow>,
    pub contacts: Vec<ContactRecord>,
    pub unpaid: Vec<UnpaidSignupRecord>,
    /// Coercions recorded by the loaders (missing columns, bad cells).
    pub load_stats: RunStats,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Payment history per resolved email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerPaymentFacts {
    pub email: String,
    pub first_payment_date: Option<NaiveDate>,
    pub last_payment_date: Option<NaiveDate>,
    pub duration_months: u32,
}

/// Spend totals per email from the engagement export. One row per email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSpendFacts {
    pub email: String,
    pub amount_all_time: Decimal,
    pub amount_year: Decimal,
    pub amount_month: Decimal,
    pub workspace: Option<String>,
}

/// Payment facts right-joined onto spend facts, with spend rate and tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedPaymentRecord {
    pub email: String,
    pub first_payment_date: Option<NaiveDate>,
    pub last_payment_date: Option<NaiveDate>,
    pub duration_months: u32,
    pub amount_all_time: Decimal,
    pub amount_year: Decimal,
    pub amount_month: Decimal,
    pub workspace: Option<String>,
    pub amount_per_month: Decimal,
    pub tier: Tier,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One row of the final report. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalReportRow {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Full_Name")]
    pub full_name: Option<String>,
    #[serde(rename = "First_Name")]
    pub first_name: Option<String>,
    #[serde(rename = "Last_Name")]
    pub last_name: Option<String>,
    #[serde(rename = "Phone_Number")]
    pub phone_number: Option<String>,
    #[serde(rename = "Phone_Country")]
    pub phone_country: Option<String>,
    #[serde(rename = "First_Payment")]
    pub first_payment_date: Option<NaiveDate>,
    #[serde(rename = "Last_Payment")]
    pub last_payment_date: Option<NaiveDate>,
    #[serde(rename = "Duration_Months")]
    pub duration_months: u32,
    #[serde(rename = "A. Payment (all time)")]
    pub amount_all_time: Decimal,
    #[serde(rename = "B. Amount (Year)")]
    pub amount_year: Decimal,
    #[serde(rename = "C. Amount (Month)")]
    pub amount_month: Decimal,
    #[serde(rename = "Workspace")]
    pub workspace: Option<String>,
    #[serde(rename = "Amount_per_month")]
    pub amount_per_month: Decimal,
    #[serde(rename = "Tier")]
    pub tier: Tier,
}

/// Customer count and share for one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummaryRow {
    #[serde(rename = "Tier")]
    pub tier: Tier,
    #[serde(rename = "Number_of_Users")]
    pub count: usize,
    #[serde(rename = "Percentage")]
    pub percentage: Decimal,
}

/// Counters describing what happened to the inputs during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub payment_events: usize,
    pub unresolved_events: usize,
    pub unparsed_timestamps: usize,
    /// Amount cells that were not numeric, plus amounts left out of a
    /// per-customer sum because it would overflow.
    pub unparsed_amounts: usize,
    /// Negative amount cells, clamped to 0.
    pub negative_amounts: usize,
    pub payment_customers: usize,
    pub spend_customers: usize,
    /// Spend rows with no email. They cannot join and carry no customer.
    pub spend_rows_without_email: usize,
    /// Customers with payment history but no spend record. Dropped by the
    /// right join; reported here so the loss is never silent.
    pub payment_only_dropped: usize,
    pub contact_matches: usize,
    pub unpaid_matches: usize,
    pub duplicate_contacts: usize,
    pub duplicate_unpaid: usize,
    /// Source name -> columns that were absent and filled with nulls.
    pub missing_columns: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub reference_date: NaiveDate,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierResult {
    pub meta: RunMeta,
    pub stats: RunStats,
    pub summary: Vec<TierSummaryRow>,
    pub rows: Vec<FinalReportRow>,
}
