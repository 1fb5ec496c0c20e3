//! CSV serialization of the final report and the tier summary.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{FinalReportRow, TierSummaryRow};

/// Report header, in column order.
pub const REPORT_COLUMNS: [&str; 15] = [
    "Email",
    "Full_Name",
    "First_Name",
    "Last_Name",
    "Phone_Number",
    "Phone_Country",
    "First_Payment",
    "Last_Payment",
    "Duration_Months",
    "A. Payment (all time)",
    "B. Amount (Year)",
    "C. Amount (Month)",
    "Workspace",
    "Amount_per_month",
    "Tier",
];

/// Summary header, in column order.
pub const SUMMARY_COLUMNS: [&str; 3] = ["Tier", "Number_of_Users", "Percentage"];

/// Write rows under a fixed header. The header is written even for an
/// empty table.
fn write_table<W: Write, T: Serialize>(
    out: W,
    header: &[&str],
    rows: &[T],
    target: &str,
) -> Result<(), ReconError> {
    let write_err = |e: csv::Error| ReconError::Write {
        target: target.into(),
        message: e.to_string(),
    };

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(header).map_err(write_err)?;
    for row in rows {
        writer.serialize(row).map_err(write_err)?;
    }
    writer.flush().map_err(|e| ReconError::Write {
        target: target.into(),
        message: e.to_string(),
    })
}

pub fn write_report<W: Write>(out: W, rows: &[FinalReportRow]) -> Result<(), ReconError> {
    write_table(out, &REPORT_COLUMNS, rows, "report")
}

pub fn write_summary<W: Write>(out: W, summary: &[TierSummaryRow]) -> Result<(), ReconError> {
    write_table(out, &SUMMARY_COLUMNS, summary, "summary")
}

pub fn write_report_csv(path: &Path, rows: &[FinalReportRow]) -> Result<(), ReconError> {
    let file = create(path)?;
    write_report(file, rows)
}

pub fn write_summary_csv(path: &Path, summary: &[TierSummaryRow]) -> Result<(), ReconError> {
    let file = create(path)?;
    write_summary(file, summary)
}

pub fn report_to_string(rows: &[FinalReportRow]) -> Result<String, ReconError> {
    let mut buf = Vec::new();
    write_report(&mut buf, rows)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn summary_to_string(summary: &[TierSummaryRow]) -> Result<String, ReconError> {
    let mut buf = Vec::new();
    write_summary(&mut buf, summary)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn create(path: &Path) -> Result<std::fs::File, ReconError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ReconError::Write {
            target: path.display().to_string(),
            message: e.to_string(),
        })?;
    }
    std::fs::File::create(path).map_err(|e| ReconError::Write {
        target: path.display().to_string(),
        message: e.to_string(),
    })
}
