use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    pub name: String,
    /// Date tenure is measured against. Callers fall back to the local date.
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub payments: SourceConfig<PaymentColumns>,
    pub spend: SourceConfig<SpendColumns>,
    pub contacts: SourceConfig<ContactColumns>,
    pub unpaid: SourceConfig<UnpaidColumns>,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig<C> {
    pub file: String,
    /// Overrides the format implied by the file extension.
    #[serde(default)]
    pub format: Option<SourceFormat>,
    #[serde(default)]
    pub columns: C,
}

impl<C> SourceConfig<C> {
    /// Explicit format, else `.ndjson`/`.jsonl` means NDJSON, else CSV.
    pub fn resolved_format(&self) -> SourceFormat {
        if let Some(format) = self.format {
            return format;
        }
        let ext = Path::new(&self.file)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("ndjson") | Some("jsonl") => SourceFormat::Ndjson,
            _ => SourceFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Ndjson,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Ndjson => write!(f, "ndjson"),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mappings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaymentColumns {
    pub time: String,
    pub primary_email: String,
    pub pre_identity_id: String,
    pub distinct_id: String,
}

impl Default for PaymentColumns {
    fn default() -> Self {
        Self {
            time: "time".into(),
            primary_email: "$email".into(),
            pre_identity_id: "$distinct_id_before_identity".into(),
            distinct_id: "distinct_id".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpendColumns {
    pub email: String,
    pub amount_all_time: String,
    pub amount_year: String,
    pub amount_month: String,
    pub workspace: String,
}

impl Default for SpendColumns {
    fn default() -> Self {
        Self {
            email: "Email".into(),
            amount_all_time: "A. Payment (all time)".into(),
            amount_year: "B. Amount (Year)".into(),
            amount_month: "C. Amount (Month)".into(),
            workspace: "Workspace".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactColumns {
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub phone_country: String,
}

impl Default for ContactColumns {
    fn default() -> Self {
        Self {
            email: "Email".into(),
            full_name: "Full_Name".into(),
            first_name: "First_Name".into(),
            last_name: "Last_Name".into(),
            phone: "Phone".into(),
            phone_country: "Phone_Country_Name".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnpaidColumns {
    pub email: String,
    /// Tried when `email` is not among the headers.
    pub email_fallback: String,
    pub phone_number: String,
    pub phone_number_country: String,
}

impl Default for UnpaidColumns {
    fn default() -> Self {
        Self {
            email: "$email".into(),
            email_fallback: "Email".into(),
            phone_number: "Phone Number".into(),
            phone_number_country: "Phone Number Country".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub report: String,
    pub summary: String,
    /// Emit all five tiers in the summary, including empty ones.
    pub zero_fill_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report: "final_merged_output.csv".into(),
            summary: "tier_summary.csv".into(),
            zero_fill_summary: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl TierConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: TierConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        for (source, file) in self.source_files() {
            if file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{source}': file must not be empty"
                )));
            }
        }

        if self.output.report.trim().is_empty() || self.output.summary.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "output paths must not be empty".into(),
            ));
        }
        if self.output.report == self.output.summary {
            return Err(ReconError::ConfigValidation(format!(
                "report and summary both write to '{}'",
                self.output.report
            )));
        }

        Ok(())
    }

    /// (source name, configured file) for all four sources.
    pub fn source_files(&self) -> [(&'static str, &str); 4] {
        [
            ("payments", self.sources.payments.file.as_str()),
            ("spend", self.sources.spend.file.as_str()),
            ("contacts", self.sources.contacts.file.as_str()),
            ("unpaid", self.sources.unpaid.file.as_str()),
        ]
    }
}

/// Resolve a configured path against the config file's directory.
pub fn resolve_path(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
