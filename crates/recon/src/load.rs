//! Source adapters: read CSV / NDJSON exports into raw tables, then map the
//! configured columns onto the typed input records.
//!
//! Missing columns and unparseable cells never fail a load. They become
//! nulls/zeros and are recorded in `RunStats`. Only unreadable or
//! structurally broken files are errors.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::{
    resolve_path, ContactColumns, PaymentColumns, SourceFormat, SpendColumns, TierConfig,
    UnpaidColumns,
};
use crate::error::ReconError;
use crate::merge::clean_field;
use crate::model::{ContactRecord, PaymentEvent, RunStats, SpendRow, TierInput, UnpaidSignupRecord};
use crate::tenure::parse_event_date;

// ---------------------------------------------------------------------------
// Raw tables
// ---------------------------------------------------------------------------

/// Header + string cells, as read from a source file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub source_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of a header: exact match first, then ASCII case-insensitive.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
    }

    /// Like `column`, but a miss is logged and recorded in `stats`.
    fn require(&self, name: &str, stats: &mut RunStats) -> Option<usize> {
        let idx = self.column(name);
        if idx.is_none() {
            log::warn!(
                "source '{}': column '{name}' not found, using empty values",
                self.source_name
            );
            stats
                .missing_columns
                .entry(self.source_name.clone())
                .or_default()
                .push(name.to_string());
        }
        idx
    }
}

/// Non-empty (after trim) cell value.
fn cell(row: &[String], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i))
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Read a whole source file, decoding Windows-1252 when it is not UTF-8.
pub fn read_source_file(source_name: &str, path: &Path) -> Result<String, ReconError> {
    let bytes = std::fs::read(path).map_err(|e| ReconError::Io {
        source_name: source_name.into(),
        message: format!("cannot read {}: {e}", path.display()),
    })?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("source '{source_name}': not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

pub fn read_table(source_name: &str, data: &str, format: SourceFormat) -> Result<RawTable, ReconError> {
    match format {
        SourceFormat::Csv => read_csv_table(source_name, data),
        SourceFormat::Ndjson => read_ndjson_table(source_name, data),
    }
}

/// Parse delimited text with a header row. The delimiter is sniffed.
pub fn read_csv_table(source_name: &str, data: &str) -> Result<RawTable, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(data))
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let csv_err = |e: csv::Error| ReconError::Csv {
        source_name: source_name.into(),
        message: e.to_string(),
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable {
        source_name: source_name.into(),
        headers,
        rows,
    })
}

/// Detect the most likely field delimiter from the first few lines.
///
/// Each candidate is scored by how many sample lines share the first line's
/// field count, times that count. Comma wins when nothing splits.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t', b'|'];
    let sample: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for &delim in candidates {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&target) = counts.first() else {
            continue;
        };
        if target <= 1 {
            continue;
        }
        let score = counts.iter().filter(|&&c| c == target).count() * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Parse an analytics export: one JSON object per line, with event
/// properties nested under `properties` and flattened onto the row.
/// Properties win over top-level keys of the same name.
pub fn read_ndjson_table(source_name: &str, data: &str) -> Result<RawTable, ReconError> {
    let mut headers: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let ndjson_err = |message: String| ReconError::Ndjson {
            source_name: source_name.into(),
            line: line_no + 1,
            message,
        };

        let value: Value = serde_json::from_str(line).map_err(|e| ndjson_err(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(ndjson_err("expected a JSON object".into()));
        };

        let properties = match object.remove("properties") {
            Some(Value::Object(props)) => Some(props),
            Some(other) => {
                object.insert("properties".into(), other);
                None
            }
            None => None,
        };

        let mut row: Vec<String> = vec![String::new(); headers.len()];
        for (key, value) in object.into_iter().chain(properties.into_iter().flatten()) {
            let idx = *index.entry(key.clone()).or_insert_with(|| {
                headers.push(key);
                headers.len() - 1
            });
            if idx >= row.len() {
                row.resize(idx + 1, String::new());
            }
            row[idx] = scalar_to_string(value);
        }
        rows.push(row);
    }

    Ok(RawTable {
        source_name: source_name.into(),
        headers,
        rows,
    })
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

pub fn payment_events(table: &RawTable, cols: &PaymentColumns, stats: &mut RunStats) -> Vec<PaymentEvent> {
    let time = table.require(&cols.time, stats);
    let primary = table.require(&cols.primary_email, stats);
    let pre_identity = table.require(&cols.pre_identity_id, stats);
    let distinct = table.require(&cols.distinct_id, stats);

    table
        .rows
        .iter()
        .map(|row| {
            let raw_time = cell(row, time);
            let date = raw_time.and_then(parse_event_date);
            if let (Some(raw), None) = (raw_time, date) {
                log::debug!("source '{}': unparseable timestamp '{raw}'", table.source_name);
                stats.unparsed_timestamps += 1;
            }
            PaymentEvent {
                date,
                primary_email: cell(row, primary).map(str::to_string),
                pre_identity_id: cell(row, pre_identity).map(str::to_string),
                distinct_id: cell(row, distinct).map(str::to_string),
            }
        })
        .collect()
}

pub fn spend_rows(table: &RawTable, cols: &SpendColumns, stats: &mut RunStats) -> Vec<SpendRow> {
    let email = table.require(&cols.email, stats);
    let all_time = table.require(&cols.amount_all_time, stats);
    let year = table.require(&cols.amount_year, stats);
    let month = table.require(&cols.amount_month, stats);
    let workspace = table.require(&cols.workspace, stats);

    table
        .rows
        .iter()
        .map(|row| SpendRow {
            email: cell(row, email).map(|e| e.trim().to_string()),
            amount_all_time: parse_amount(&table.source_name, cell(row, all_time), stats),
            amount_year: parse_amount(&table.source_name, cell(row, year), stats),
            amount_month: parse_amount(&table.source_name, cell(row, month), stats),
            workspace: clean_field(cell(row, workspace)),
        })
        .collect()
}

pub fn contact_records(table: &RawTable, cols: &ContactColumns, stats: &mut RunStats) -> Vec<ContactRecord> {
    let email = table.require(&cols.email, stats);
    let full_name = table.require(&cols.full_name, stats);
    let first_name = table.require(&cols.first_name, stats);
    let last_name = table.require(&cols.last_name, stats);
    let phone = table.require(&cols.phone, stats);
    let phone_country = table.require(&cols.phone_country, stats);

    table
        .rows
        .iter()
        .map(|row| ContactRecord {
            email: cell(row, email).unwrap_or("").trim().to_string(),
            full_name: cell(row, full_name).map(|v| v.trim().to_string()),
            first_name: cell(row, first_name).map(|v| v.trim().to_string()),
            last_name: cell(row, last_name).map(|v| v.trim().to_string()),
            phone: cell(row, phone).map(str::to_string),
            phone_country: cell(row, phone_country).map(str::to_string),
        })
        .collect()
}

pub fn unpaid_records(table: &RawTable, cols: &UnpaidColumns, stats: &mut RunStats) -> Vec<UnpaidSignupRecord> {
    let email = match table.column(&cols.email) {
        Some(idx) => Some(idx),
        None => table
            .column(&cols.email_fallback)
            .or_else(|| table.require(&cols.email, stats)),
    };
    let phone = table.require(&cols.phone_number, stats);
    let country = table.require(&cols.phone_number_country, stats);

    table
        .rows
        .iter()
        .map(|row| UnpaidSignupRecord {
            email: cell(row, email).unwrap_or("").trim().to_string(),
            phone_number: cell(row, phone).map(str::to_string),
            phone_number_country: cell(row, country).map(str::to_string),
        })
        .collect()
}

/// Decimal amount; empty or sentinel cells are 0, garbage is 0 and counted.
/// Amounts are non-negative: a negative value is clamped to 0 and counted.
fn parse_amount(source_name: &str, raw: Option<&str>, stats: &mut RunStats) -> Decimal {
    let Some(value) = clean_field(raw) else {
        return Decimal::ZERO;
    };
    match Decimal::from_str(&value).or_else(|_| Decimal::from_scientific(&value)) {
        Ok(amount) if amount.is_sign_negative() && !amount.is_zero() => {
            log::debug!("source '{source_name}': negative amount '{value}' clamped to 0");
            stats.negative_amounts += 1;
            Decimal::ZERO
        }
        Ok(amount) => amount,
        Err(_) => {
            log::debug!("source '{source_name}': non-numeric amount '{value}' counted as 0");
            stats.unparsed_amounts += 1;
            Decimal::ZERO
        }
    }
}

// ---------------------------------------------------------------------------
// Whole input
// ---------------------------------------------------------------------------

/// Read all four sources named in `config`, resolving relative paths
/// against `base_dir`. Any unreadable source aborts the load.
pub fn load_input(config: &TierConfig, base_dir: &Path) -> Result<TierInput, ReconError> {
    let sources = &config.sources;
    let mut stats = RunStats::default();

    let table = |name: &str, file: &str, format: SourceFormat| -> Result<RawTable, ReconError> {
        let path = resolve_path(base_dir, file);
        let data = read_source_file(name, &path)?;
        let table = read_table(name, &data, format)?;
        log::info!(
            "source '{name}': {} rows from {} ({format})",
            table.rows.len(),
            path.display()
        );
        Ok(table)
    };

    let payments_table = table("payments", &sources.payments.file, sources.payments.resolved_format())?;
    let spend_table = table("spend", &sources.spend.file, sources.spend.resolved_format())?;
    let contacts_table = table("contacts", &sources.contacts.file, sources.contacts.resolved_format())?;
    let unpaid_table = table("unpaid", &sources.unpaid.file, sources.unpaid.resolved_format())?;

    let payments = payment_events(&payments_table, &sources.payments.columns, &mut stats);
    let spend = spend_rows(&spend_table, &sources.spend.columns, &mut stats);
    let contacts = contact_records(&contacts_table, &sources.contacts.columns, &mut stats);
    let unpaid = unpaid_records(&unpaid_table, &sources.unpaid.columns, &mut stats);

    Ok(TierInput {
        payments,
        spend,
        contacts,
        unpaid,
        load_stats: stats,
    })
}
