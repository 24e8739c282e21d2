//! `dayrecon compare|run|validate`: two-source daily reconciliation.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use dayrecon_recon::config::{ColumnCandidates, ColumnOverrides};
use dayrecon_recon::engine::load_input;
use dayrecon_recon::export::{export_csv, export_json, to_json_string};
use dayrecon_recon::report::render_summary;
use dayrecon_recon::table::read_table;
use dayrecon_recon::{ReconConfig, ReconInput, ReconOptions, ReconResult, Source};
use encoding_rs::Encoding;

use crate::exit_codes::{EXIT_ERROR, EXIT_RECON_FLAGGED, EXIT_RECON_INVALID_CONFIG};
use crate::CliError;

/// Where and how a finished run is written.
#[derive(Debug, Default)]
pub struct OutputTargets {
    /// Print the JSON result on stdout instead of the human summary.
    pub json: bool,
    pub csv_file: Option<PathBuf>,
    pub json_file: Option<PathBuf>,
    pub fail_on_flagged: bool,
}

/// Arguments of `dayrecon compare`.
#[derive(Debug)]
pub struct CompareArgs {
    pub primary: PathBuf,
    pub reference: PathBuf,
    pub threshold: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub primary_label: Option<String>,
    pub reference_label: Option<String>,
    /// `FIELD=NAME` candidate overrides per side.
    pub primary_columns: Vec<String>,
    pub reference_columns: Vec<String>,
    pub encoding: String,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// compare
// ============================================================================

fn column_candidates(assignments: &[String], flag: &str) -> Result<ColumnCandidates, CliError> {
    let overrides = ColumnOverrides::from_assignments(assignments).map_err(|e| {
        CliError::usage(e.to_string())
            .with_hint(format!("{flag} takes FIELD=NAME, e.g. {flag} transactions=ga4_transactions"))
    })?;
    Ok(ColumnCandidates::with_overrides(&overrides))
}

pub fn cmd_compare(args: CompareArgs, out: OutputTargets) -> Result<(), CliError> {
    let options = ReconOptions {
        name: format!("{} vs {}", file_name(&args.primary), file_name(&args.reference)),
        threshold: args.threshold,
        period_start: args.start_date,
        period_end: args.end_date,
        primary_label: args.primary_label.unwrap_or_else(|| Source::Primary.to_string()),
        reference_label: args.reference_label.unwrap_or_else(|| Source::Reference.to_string()),
        primary_columns: column_candidates(&args.primary_columns, "--primary-column")?,
        reference_columns: column_candidates(&args.reference_columns, "--reference-column")?,
    };
    options
        .validate()
        .map_err(|e| CliError::usage(e.to_string()))?;

    let encoding = Encoding::for_label(args.encoding.as_bytes()).ok_or_else(|| {
        CliError::usage(format!("unknown encoding: \"{}\"", args.encoding))
            .with_hint("use a WHATWG label such as windows-1250, iso-8859-2 or utf-8")
    })?;

    let input = ReconInput {
        primary: read_table(&args.primary, &args.primary.display().to_string(), encoding)
            .map_err(CliError::recon)?,
        reference: read_table(&args.reference, &args.reference.display().to_string(), encoding)
            .map_err(CliError::recon)?,
    };

    let result = dayrecon_recon::run(&options, &input).map_err(CliError::recon)?;
    emit(&result, &out)
}

// ============================================================================
// run
// ============================================================================

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(
            EXIT_RECON_INVALID_CONFIG,
            format!("cannot read config {}: {e}", config_path.display()),
        )
    })?;
    ReconConfig::from_toml(&config_str).map_err(CliError::recon)
}

fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

pub fn cmd_run(config_path: PathBuf, mut out: OutputTargets) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_dir(&config_path);
    let input = load_input(&config, base_dir).map_err(CliError::recon)?;

    let result = dayrecon_recon::run(&ReconOptions::from_config(&config), &input)
        .map_err(CliError::recon)?;

    if out.csv_file.is_none() {
        out.csv_file = config.output.csv.as_ref().map(|p| base_dir.join(p));
    }
    if out.json_file.is_none() {
        out.json_file = config.output.json.as_ref().map(|p| base_dir.join(p));
    }
    emit(&result, &out)
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_dir(&config_path);

    for source in [Source::Primary, Source::Reference] {
        let path = base_dir.join(&config.sources.get(source).file);
        if !path.is_file() {
            tracing::warn!(%source, path = %path.display(), "source file not found");
        }
    }

    eprintln!(
        "valid: recon '{}' ({} vs {}), threshold {:.2}%",
        config.name,
        config.sources.primary.label_or(Source::Primary),
        config.sources.reference.label_or(Source::Reference),
        config.threshold,
    );
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn emit(result: &ReconResult, out: &OutputTargets) -> Result<(), CliError> {
    if let Some(ref path) = out.csv_file {
        export_csv(&result.table, path).map_err(|e| recon_err(EXIT_ERROR, e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(ref path) = out.json_file {
        export_json(result, path).map_err(|e| recon_err(EXIT_ERROR, e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }

    if out.json {
        let json_str = to_json_string(result).map_err(|e| recon_err(EXIT_ERROR, e.to_string()))?;
        println!("{json_str}");
    } else {
        print!("{}", render_summary(result));
    }

    let flagged = result.summary.flagged_dates.len();
    if out.fail_on_flagged && flagged > 0 {
        return Err(recon_err(
            EXIT_RECON_FLAGGED,
            format!("{flagged} day(s) over the {:.2}% threshold", result.summary.threshold),
        ));
    }
    Ok(())
}
