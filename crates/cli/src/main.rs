// tierwise CLI - customer payment reconciliation and loyalty tiering

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use exit_codes::{recon_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tierwise")]
#[command(about = "Reconcile payment, spend and CRM exports into customer loyalty tiers")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Only log warnings and errors (overridden by RUST_LOG)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tiering pass from a TOML config file
    #[command(after_help = "\
Examples:
  tierwise run tiering.toml
  tierwise run tiering.toml --today 2026-10-19
  tierwise run tiering.toml --json > result.json
  tierwise run tiering.toml --report out/report.csv --summary out/summary.csv")]
    Run {
        /// Path to the tiering config file
        config: PathBuf,

        /// Reference date for tenure (YYYY-MM-DD); defaults to the config's
        /// reference_date, then to the local date
        #[arg(long, value_parser = parse_date, env = "TIERWISE_TODAY")]
        today: Option<NaiveDate>,

        /// Write the report CSV here instead of the configured path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write the tier summary CSV here instead of the configured path
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Print the full JSON result to stdout
        #[arg(long)]
        json: bool,

        /// Write the full JSON result to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a tiering config without reading any source
    #[command(after_help = "\
Examples:
  tierwise validate tiering.toml")]
    Validate {
        /// Path to the tiering config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  tierwise-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{s}': {e}"))
}

fn init_logging(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            today,
            report,
            summary,
            json,
            output,
        } => run::cmd_run(run::RunArgs {
            config,
            today,
            report,
            summary,
            json,
            output,
        }),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<tierwise_recon::ReconError> for CliError {
    fn from(err: tierwise_recon::ReconError) -> Self {
        use tierwise_recon::ReconError;

        let hint = match &err {
            ReconError::Io { .. } => {
                Some("source paths are resolved relative to the config file".to_string())
            }
            ReconError::ConfigParse(_) => {
                Some("run `tierwise validate <config>` to check the file".to_string())
            }
            _ => None,
        };
        CliError { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}
