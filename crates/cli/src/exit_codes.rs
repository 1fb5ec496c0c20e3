//! CLI exit code registry.
//!
//! Single source of truth for the codes `tierwise` returns. Scripts that
//! schedule tiering runs branch on these, so they are part of the contract.
//!
//! | Code  | Meaning                                          |
//! |-------|--------------------------------------------------|
//! | 0     | Success                                          |
//! | 1     | General error (unspecified)                      |
//! | 2     | Usage error (bad arguments, unreadable config)   |
//! | 60    | Config invalid (parse or validation failure)     |
//! | 61    | An input source could not be read or parsed      |
//! | 62    | An output file could not be written              |

use tierwise_recon::ReconError;

/// Success - run completed and outputs were written.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (JSON serialization, ...).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments or a config path that cannot be read.
pub const EXIT_USAGE: u8 = 2;

/// Config file parsed badly or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 60;

/// A source file is missing, unreadable, or structurally malformed.
/// Nothing has been written when this is returned.
pub const EXIT_INPUT: u8 = 61;

/// The report, summary, or JSON output could not be written.
pub const EXIT_OUTPUT: u8 = 62;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Io { .. } | ReconError::Csv { .. } | ReconError::Ndjson { .. } => EXIT_INPUT,
        ReconError::Write { .. } => EXIT_OUTPUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_INPUT,
            EXIT_OUTPUT,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn engine_errors_map_by_stage() {
        assert_eq!(recon_exit_code(&ReconError::ConfigParse("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(
            recon_exit_code(&ReconError::Ndjson {
                source_name: "payments".into(),
                line: 3,
                message: "x".into(),
            }),
            EXIT_INPUT
        );
        assert_eq!(
            recon_exit_code(&ReconError::Write { target: "report".into(), message: "x".into() }),
            EXIT_OUTPUT
        );
    }
}
