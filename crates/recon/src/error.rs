use thiserror::Error;

/// Fatal errors for a tiering run.
///
/// Missing columns and unparseable cells are not errors: they are coerced
/// to null/zero by the loaders and counted in `RunStats`.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty name, bad format, clashing outputs).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// A source file could not be read.
    #[error("source '{source_name}': {message}")]
    Io { source_name: String, message: String },

    /// CSV structure is broken (unbalanced quotes, bad UTF-8, ...).
    #[error("source '{source_name}': malformed CSV: {message}")]
    Csv { source_name: String, message: String },

    /// A line of an NDJSON export is not a JSON object.
    #[error("source '{source_name}', line {line}: malformed NDJSON: {message}")]
    Ndjson {
        source_name: String,
        line: usize,
        message: String,
    },

    /// An output table could not be written.
    #[error("cannot write {target}: {message}")]
    Write { target: String, message: String },
}
