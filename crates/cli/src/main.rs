// dayrecon CLI - compare two daily metric exports and flag diverging days

mod exit_codes;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dayrecon_recon::config::DEFAULT_THRESHOLD;
use dayrecon_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_SUCCESS, EXIT_USAGE};
use recon::{CompareArgs, OutputTargets};

#[derive(Parser)]
#[command(name = "dayrecon")]
#[command(about = "Reconcile daily transactions and revenue between two sources")]
#[command(version)]
struct Cli {
    /// Debug-level diagnostics on stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only errors on stderr (RUST_LOG overrides)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two CSV exports day by day
    #[command(after_help = "\
Examples:
  dayrecon compare ga4.csv crm.csv
  dayrecon compare ga4.csv crm.csv --threshold 5 --output out/recon.csv
  dayrecon compare ga4.csv crm.csv --start-date 2024-01-01 --end-date 2024-01-31 --json
  dayrecon compare ga4.csv crm.csv --fail-on-flagged
  dayrecon compare ga4.csv crm.csv --primary-column transactions=ga4_transactions --primary-column revenue=ga4_revenue")]
    Compare {
        /// Primary (measured) source, e.g. the analytics export
        primary: PathBuf,

        /// Reference source the primary is checked against, e.g. the CRM export
        reference: PathBuf,

        /// Flag a day when |diff %| exceeds this value
        #[arg(long, short = 't', default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Requested period start (YYYY-MM-DD); reported, never filters
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Requested period end (YYYY-MM-DD); reported, never filters
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Name shown for the primary source in the report
        #[arg(long)]
        primary_label: Option<String>,

        /// Name shown for the reference source in the report
        #[arg(long)]
        reference_label: Option<String>,

        /// Column candidate for the primary source as FIELD=NAME (date,
        /// transactions or revenue); repeat to try several names in order
        #[arg(long = "primary-column", value_name = "FIELD=NAME")]
        primary_columns: Vec<String>,

        /// Column candidate for the reference source as FIELD=NAME
        #[arg(long = "reference-column", value_name = "FIELD=NAME")]
        reference_columns: Vec<String>,

        /// Fallback encoding for files that are not valid UTF-8
        #[arg(long, default_value = "windows-1252")]
        encoding: String,

        /// Write the per-day table as CSV
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write the full JSON result to file
        #[arg(long)]
        json_output: Option<PathBuf>,

        /// Exit 62 when any day is flagged
        #[arg(long)]
        fail_on_flagged: bool,
    },

    /// Run a reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  dayrecon run ga4-vs-crm.recon.toml
  dayrecon run ga4-vs-crm.recon.toml --json
  dayrecon run ga4-vs-crm.recon.toml --output result.json")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit 62 when any day is flagged
        #[arg(long)]
        fail_on_flagged: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  dayrecon validate ga4-vs-crm.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Compare {
            primary,
            reference,
            threshold,
            start_date,
            end_date,
            primary_label,
            reference_label,
            primary_columns,
            reference_columns,
            encoding,
            output,
            json,
            json_output,
            fail_on_flagged,
        } => recon::cmd_compare(
            CompareArgs {
                primary,
                reference,
                threshold,
                start_date,
                end_date,
                primary_label,
                reference_label,
                primary_columns,
                reference_columns,
                encoding,
            },
            OutputTargets { json, csv_file: output, json_file: json_output, fail_on_flagged },
        ),
        Commands::Run { config, json, output, fail_on_flagged } => recon::cmd_run(
            config,
            OutputTargets { json, csv_file: None, json_file: output, fail_on_flagged },
        ),
        Commands::Validate { config } => recon::cmd_validate(config),
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
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with the matching exit code.
    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::MissingDateColumn { .. } => Some(
                "rename the column or list it under [sources.<role>.columns] date in a .recon.toml"
                    .to_string(),
            ),
            ReconError::DateParse { .. } => {
                Some("dates must be YYYY-MM-DD, YYYY/MM/DD, DD.MM.YYYY or YYYYMMDD".to_string())
            }
            e if e.is_input_error() => {
                Some("check the export's delimiter, quoting and --encoding".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_RECON_INPUT, EXIT_RECON_INVALID_CONFIG};

    #[test]
    fn input_errors_carry_a_hint() {
        let err = CliError::recon(ReconError::Csv {
            source_label: "crm.csv".into(),
            message: "unequal lengths".into(),
        });
        assert_eq!(err.code, EXIT_RECON_INPUT);
        assert!(err.hint.unwrap().contains("--encoding"));
    }

    #[test]
    fn config_and_io_errors_have_no_input_hint() {
        let err = CliError::recon(ReconError::ConfigValidation("threshold".into()));
        assert_eq!(err.code, EXIT_RECON_INVALID_CONFIG);
        assert!(err.hint.is_none());
        assert!(CliError::recon(ReconError::Io("gone".into())).hint.is_none());
    }
}
