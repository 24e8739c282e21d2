//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | recon            | Reconciliation run outcomes              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use dayrecon_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (output could not be written).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config file unreadable, malformed TOML, or failed validation
/// (non-positive threshold, inverted period, empty candidate list).
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// Input could not be used: unreadable file, malformed CSV, no date
/// column, or an unparseable date cell.
pub const EXIT_RECON_INPUT: u8 = 61;

/// Flagged days found and `--fail-on-flagged` was given.
pub const EXIT_RECON_FLAGGED: u8 = 62;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingDateColumn { .. }
        | ReconError::DateParse { .. }
        | ReconError::Csv { .. }
        | ReconError::Io(_) => EXIT_RECON_INPUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_invalid_config() {
        assert_eq!(
            recon_exit_code(&ReconError::ConfigValidation("threshold".into())),
            EXIT_RECON_INVALID_CONFIG
        );
        assert_eq!(
            recon_exit_code(&ReconError::ConfigParse("bad toml".into())),
            EXIT_RECON_INVALID_CONFIG
        );
    }

    #[test]
    fn input_errors_map_to_input() {
        let err = ReconError::DateParse {
            source_label: "crm.csv".into(),
            row: 3,
            value: "yesterday".into(),
        };
        assert_eq!(recon_exit_code(&err), EXIT_RECON_INPUT);
        assert_eq!(recon_exit_code(&ReconError::Io("gone".into())), EXIT_RECON_INPUT);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_RECON_INVALID_CONFIG,
            EXIT_RECON_INPUT,
            EXIT_RECON_FLAGGED,
        ];
        let unique: std::collections::HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
