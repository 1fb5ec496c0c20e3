use std::path::PathBuf;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use tierwise_recon::config::{resolve_path, SourceFormat, TierConfig};
use tierwise_recon::engine::run;
use tierwise_recon::export::{report_to_string, summary_to_string, write_report_csv, write_summary_csv};
use tierwise_recon::load::load_input;
use tierwise_recon::model::TierResult;
use tierwise_recon::{ReconError, Tier};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> TierConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("tiering.toml")).unwrap();
    TierConfig::from_toml(&toml).unwrap()
}

fn load_and_run(config: &TierConfig) -> TierResult {
    let input = load_input(config, &fixtures_dir()).unwrap();
    let today = config.reference_date.expect("fixture pins reference_date");
    run(config, &input, today)
}

fn date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// -------------------------------------------------------------------------
// Full pipeline over CSV fixtures
// -------------------------------------------------------------------------

#[test]
fn fixture_tiers_one_customer_per_tier() {
    let result = load_and_run(&fixture_config());

    let tiers: Vec<(&str, Tier)> = result.rows.iter().map(|r| (r.email.as_str(), r.tier)).collect();
    assert_eq!(
        tiers,
        vec![
            ("bronze@acme.io", Tier::Bronze),
            ("gold@acme.io", Tier::Gold),
            ("plat@acme.io", Tier::Platinum),
            ("silver@acme.io", Tier::Silver),
            ("vip@acme.io", Tier::Vip),
        ]
    );

    for row in &result.summary {
        assert_eq!(row.count, 1);
        assert_eq!(row.percentage, dec!(20.00));
    }
    let order: Vec<Tier> = result.summary.iter().map(|r| r.tier).collect();
    assert_eq!(order, Tier::ORDER.to_vec());
}

#[test]
fn fixture_tenure_and_spend_rate() {
    let result = load_and_run(&fixture_config());
    let row = |email: &str| result.rows.iter().find(|r| r.email == email).unwrap();

    let vip = row("vip@acme.io");
    assert_eq!(vip.first_payment_date, date("2024-01-15"));
    assert_eq!(vip.last_payment_date, date("2025-06-01"));
    assert_eq!(vip.duration_months, 34);
    assert_eq!(vip.amount_all_time, dec!(1500));
    assert_eq!(vip.amount_year, dec!(600));
    assert_eq!(vip.amount_month, dec!(60));
    assert_eq!(vip.workspace.as_deref(), Some("Acme"));
    assert_eq!(vip.amount_per_month, dec!(44.12));

    let gold = row("gold@acme.io");
    assert_eq!(gold.first_payment_date, date("2026-04-19"));
    assert_eq!(gold.last_payment_date, date("2026-08-30"));
    assert_eq!(gold.duration_months, 6);
    assert_eq!(gold.amount_per_month, dec!(90.00));

    let bronze = row("bronze@acme.io");
    assert_eq!(bronze.first_payment_date, None);
    assert_eq!(bronze.duration_months, 0);
    assert_eq!(bronze.amount_per_month, bronze.amount_all_time);
}

#[test]
fn fixture_contacts_and_phone_reconciliation() {
    let result = load_and_run(&fixture_config());
    let row = |email: &str| result.rows.iter().find(|r| r.email == email).unwrap();

    let vip = row("vip@acme.io");
    assert_eq!(vip.full_name.as_deref(), Some("Vera Ip"));
    assert_eq!(vip.phone_number.as_deref(), Some("+1 555 0100"));
    assert_eq!(vip.phone_country.as_deref(), Some("United States"));

    let plat = row("plat@acme.io");
    assert_eq!(plat.phone_number.as_deref(), Some("+44 20 7946 0000"));
    assert_eq!(plat.phone_country.as_deref(), Some("United Kingdom"));

    let gold = row("gold@acme.io");
    assert_eq!(gold.first_name.as_deref(), Some("Gil"));
    assert_eq!(gold.phone_number, None);

    let silver = row("silver@acme.io");
    assert_eq!(silver.full_name, None);
    assert_eq!(silver.phone_number, None);
    assert_eq!(silver.phone_country, None);
}

#[test]
fn fixture_stats_account_for_every_input() {
    let result = load_and_run(&fixture_config());
    let s = &result.stats;

    assert_eq!(s.payment_events, 10);
    assert_eq!(s.unresolved_events, 1);
    assert_eq!(s.unparsed_timestamps, 1);
    assert_eq!(s.payment_customers, 5);
    assert_eq!(s.spend_customers, 5);
    assert_eq!(s.spend_rows_without_email, 0);
    assert_eq!(s.negative_amounts, 0);
    assert_eq!(s.payment_only_dropped, 1);
    assert_eq!(s.contact_matches, 3);
    assert_eq!(s.unpaid_matches, 3);
    assert_eq!(s.duplicate_contacts, 1);
    assert_eq!(s.duplicate_unpaid, 1);
    assert!(s.missing_columns.is_empty());
    assert!(result.rows.iter().all(|r| r.email != "ghost@acme.io"));
}

#[test]
fn ndjson_payments_match_csv_payments() {
    let csv_result = load_and_run(&fixture_config());

    let mut config = fixture_config();
    config.sources.payments.file = "payments.ndjson".into();
    assert_eq!(config.sources.payments.resolved_format(), SourceFormat::Ndjson);
    let ndjson_result = load_and_run(&config);

    assert_eq!(ndjson_result.rows, csv_result.rows);
    assert_eq!(ndjson_result.summary, csv_result.summary);
    assert_eq!(ndjson_result.stats.unresolved_events, 1);
    assert_eq!(ndjson_result.stats.unparsed_timestamps, 1);
}

#[test]
fn later_reference_date_promotes_tenure() {
    let config = fixture_config();
    let input = load_input(&config, &fixtures_dir()).unwrap();

    // Four years on, plat@ has 60 months at 1800/60 = 30.00: exactly VIP's floor
    let later = NaiveDate::from_ymd_opt(2030, 10, 19).unwrap();
    let result = run(&config, &input, later);
    let plat = result.rows.iter().find(|r| r.email == "plat@acme.io").unwrap();
    assert_eq!(plat.duration_months, 60);
    assert_eq!(plat.amount_per_month, dec!(30.00));
    assert_eq!(plat.tier, Tier::Vip);
}

// -------------------------------------------------------------------------
// Outputs
// -------------------------------------------------------------------------

#[test]
fn report_and_summary_csv_files() {
    let config = fixture_config();
    let result = load_and_run(&config);

    let dir = tempfile::tempdir().unwrap();
    let report_path = resolve_path(dir.path(), &config.output.report);
    let summary_path = resolve_path(dir.path(), &config.output.summary);
    write_report_csv(&report_path, &result.rows).unwrap();
    write_summary_csv(&summary_path, &result.summary).unwrap();

    let report = std::fs::read_to_string(&report_path).unwrap();
    assert_eq!(report, report_to_string(&result.rows).unwrap());
    let vip_line = report.lines().find(|l| l.starts_with("vip@acme.io")).unwrap();
    assert_eq!(
        vip_line,
        "vip@acme.io,Vera Ip,Vera,Ip,+1 555 0100,United States,2024-01-15,2025-06-01,34,1500,600,60,Acme,44.12,VIP"
    );

    let summary = std::fs::read_to_string(&summary_path).unwrap();
    assert_eq!(summary, summary_to_string(&result.summary).unwrap());
    assert_eq!(
        summary,
        "Tier,Number_of_Users,Percentage\n\
         VIP,1,20.00\n\
         Platinum,1,20.00\n\
         Gold,1,20.00\n\
         Silver,1,20.00\n\
         Bronze,1,20.00\n"
    );
}

// -------------------------------------------------------------------------
// Failure modes
// -------------------------------------------------------------------------

#[test]
fn missing_source_file_aborts_with_source_name() {
    let mut config = fixture_config();
    config.sources.contacts.file = "no-such-contacts.csv".into();
    let err = load_input(&config, &fixtures_dir()).unwrap_err();
    assert!(matches!(err, ReconError::Io { ref source_name, .. } if source_name == "contacts"));
    assert!(err.to_string().contains("no-such-contacts.csv"));
}

#[test]
fn missing_columns_degrade_to_nulls() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["payments.csv", "spend.csv", "unpaid.csv"] {
        std::fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }
    // CRM export without any phone columns
    std::fs::write(
        dir.path().join("contacts.csv"),
        "Email,Full_Name\nvip@acme.io,Vera Ip\n",
    )
    .unwrap();

    let config = fixture_config();
    let input = load_input(&config, dir.path()).unwrap();
    let result = run(&config, &input, config.reference_date.unwrap());

    let missing = &result.stats.missing_columns["contacts"];
    assert!(missing.contains(&"Phone".to_string()));
    assert!(missing.contains(&"Phone_Country_Name".to_string()));

    let vip = result.rows.iter().find(|r| r.email == "vip@acme.io").unwrap();
    assert_eq!(vip.full_name.as_deref(), Some("Vera Ip"));
    // CRM has no phone, so the signup phone fills in
    assert_eq!(vip.phone_number.as_deref(), Some("+9999"));
    assert_eq!(result.rows.len(), 5);
}
