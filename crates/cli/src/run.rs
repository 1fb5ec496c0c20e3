//! `tierwise run` / `tierwise validate`: config-driven tiering runs.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use tierwise_recon::config::resolve_path;
use tierwise_recon::export::{write_report_csv, write_summary_csv};
use tierwise_recon::load::load_input;
use tierwise_recon::{TierConfig, TierResult};

use crate::exit_codes::{EXIT_ERROR, EXIT_OUTPUT};
use crate::CliError;

pub struct RunArgs {
    pub config: PathBuf,
    pub today: Option<NaiveDate>,
    pub report: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
}

/// Read and parse a config file. Returns the config and the directory its
/// relative paths resolve against.
fn load_config(config_path: &Path) -> Result<(TierConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::usage(format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = TierConfig::from_toml(&config_str)?;

    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

/// Reference date precedence: `--today`, then the config, then the local date.
fn reference_date(flag: Option<NaiveDate>, config: &TierConfig) -> NaiveDate {
    flag.or(config.reference_date)
        .unwrap_or_else(|| chrono::Local::now().date_naive())
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&args.config)?;

    let report_path = args
        .report
        .unwrap_or_else(|| resolve_path(&base_dir, &config.output.report));
    let summary_path = args
        .summary
        .unwrap_or_else(|| resolve_path(&base_dir, &config.output.summary));
    if report_path == summary_path {
        return Err(CliError::usage(format!(
            "report and summary both write to {}",
            report_path.display()
        ))
        .with_hint("pass distinct --report and --summary paths"));
    }

    let today = reference_date(args.today, &config);
    log::info!("tiering '{}' as of {today}", config.name);

    // All sources are read before anything is written
    let input = load_input(&config, &base_dir)?;
    let result = tierwise_recon::run(&config, &input, today);

    write_report_csv(&report_path, &result.rows)?;
    eprintln!("wrote {}", report_path.display());
    write_summary_csv(&summary_path, &result.summary)?;
    eprintln!("wrote {}", summary_path.display());

    if args.json || args.output.is_some() {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.output {
            std::fs::write(path, &json_str).map_err(|e| {
                CliError::new(EXIT_OUTPUT, format!("cannot write {}: {e}", path.display()))
            })?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    print_summary(&result);
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &TierResult) {
    let s = &result.stats;
    eprintln!(
        "{} customers tiered as of {} ({} payment events, {} unresolved)",
        result.rows.len(),
        result.meta.reference_date,
        s.payment_events,
        s.unresolved_events,
    );
    for row in &result.summary {
        eprintln!("  {:<9} {:>6}  {:>6}%", row.tier.label(), row.count, row.percentage);
    }
    if s.payment_only_dropped > 0 {
        eprintln!(
            "note: {} paying customer(s) without a spend record were left out",
            s.payment_only_dropped
        );
    }
    if s.spend_rows_without_email > 0 {
        eprintln!(
            "note: {} spend row(s) without an email were left out",
            s.spend_rows_without_email
        );
    }
    if s.negative_amounts > 0 {
        eprintln!("note: {} negative amount(s) were counted as 0", s.negative_amounts);
    }
    for (source, columns) in &s.missing_columns {
        eprintln!("note: {source} is missing column(s): {}", columns.join(", "));
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;

    eprintln!("valid: tiering '{}'", config.name);
    let sources = [
        ("payments", &config.sources.payments.file, config.sources.payments.resolved_format()),
        ("spend", &config.sources.spend.file, config.sources.spend.resolved_format()),
        ("contacts", &config.sources.contacts.file, config.sources.contacts.resolved_format()),
        ("unpaid", &config.sources.unpaid.file, config.sources.unpaid.resolved_format()),
    ];
    for (name, file, format) in sources {
        eprintln!(
            "  {name:<9} {} ({format})",
            resolve_path(&base_dir, file).display()
        );
    }
    match config.reference_date {
        Some(date) => eprintln!("  reference date {date}"),
        None => eprintln!("  reference date: local date at run time"),
    }
    Ok(())
}
