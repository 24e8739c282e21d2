use std::path::Path;

use chrono::NaiveDate;

use crate::align::align;
use crate::config::{validate_period, validate_threshold, ColumnCandidates, ReconConfig, DEFAULT_THRESHOLD};
use crate::deviation::compute_deviations;
use crate::error::ReconError;
use crate::model::{CanonicalRecord, Metric, ReconInput, ReconMeta, ReconResult, Source};
use crate::normalize::{normalize, resolve_date_column};
use crate::report::build_table;
use crate::summary::summarize;
use crate::table::{read_table, RawTable};

/// Everything a run depends on besides its two input tables.
#[derive(Debug, Clone)]
pub struct ReconOptions {
    pub name: String,
    pub threshold: f64,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub primary_label: String,
    pub reference_label: String,
    pub primary_columns: ColumnCandidates,
    pub reference_columns: ColumnCandidates,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            name: "reconciliation".into(),
            threshold: DEFAULT_THRESHOLD,
            period_start: None,
            period_end: None,
            primary_label: Source::Primary.to_string(),
            reference_label: Source::Reference.to_string(),
            primary_columns: ColumnCandidates::default(),
            reference_columns: ColumnCandidates::default(),
        }
    }
}

impl ReconOptions {
    pub fn from_config(config: &ReconConfig) -> Self {
        let (period_start, period_end) = config
            .period
            .map(|p| (p.start, p.end))
            .unwrap_or((None, None));
        Self {
            name: config.name.clone(),
            threshold: config.threshold,
            period_start,
            period_end,
            primary_label: config.sources.primary.label_or(Source::Primary),
            reference_label: config.sources.reference.label_or(Source::Reference),
            primary_columns: config.candidates(Source::Primary),
            reference_columns: config.candidates(Source::Reference),
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        validate_threshold(self.threshold)?;
        validate_period(self.period_start, self.period_end)
    }

    fn columns(&self, source: Source) -> &ColumnCandidates {
        match source {
            Source::Primary => &self.primary_columns,
            Source::Reference => &self.reference_columns,
        }
    }
}

/// Run the full pipeline: normalize → align → deviations → summary.
///
/// A missing date column on either side aborts before any row is read.
pub fn run(options: &ReconOptions, input: &ReconInput) -> Result<ReconResult, ReconError> {
    options.validate()?;

    // Both headers are checked before any row is read
    resolve_date_column(&input.primary, options.columns(Source::Primary))?;
    resolve_date_column(&input.reference, options.columns(Source::Reference))?;

    let primary = normalize(Source::Primary, &input.primary, options.columns(Source::Primary))?;
    let reference = normalize(
        Source::Reference,
        &input.reference,
        options.columns(Source::Reference),
    )?;

    run_records(options, &primary, &reference)
}

/// Pipeline from already-canonical records.
pub fn run_records(
    options: &ReconOptions,
    primary: &[CanonicalRecord],
    reference: &[CanonicalRecord],
) -> Result<ReconResult, ReconError> {
    options.validate()?;

    let aligned = align(primary, reference);
    let deviations = compute_deviations(&aligned, options.threshold);
    let summary = summarize(
        &aligned,
        &deviations,
        options.threshold,
        (options.period_start, options.period_end),
    );
    let table = build_table(&aligned, &deviations);

    for metric in Metric::ALL {
        let s = summary.metric(metric);
        if summary.days > 0 && s.compared_days == 0 {
            tracing::warn!(
                %metric,
                primary_measured = s.primary_total.is_some(),
                reference_measured = s.reference_total.is_some(),
                "metric not compared on any day"
            );
        }
    }

    Ok(ReconResult {
        meta: ReconMeta {
            name: options.name.clone(),
            primary_label: options.primary_label.clone(),
            reference_label: options.reference_label.clone(),
            threshold: options.threshold,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary,
        table,
        aligned,
        deviations,
    })
}

/// Load both source files named by `config`, resolving paths relative to
/// `base_dir`. Table labels are the resolved paths so input errors name the
/// offending file.
pub fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, ReconError> {
    let load = |source: Source| -> Result<RawTable, ReconError> {
        let sc = config.sources.get(source);
        let path = base_dir.join(&sc.file);
        let table = read_table(&path, &path.display().to_string(), sc.fallback_encoding()?)?;
        tracing::info!(%source, path = %path.display(), rows = table.len(), "loaded source");
        Ok(table)
    };

    Ok(ReconInput {
        primary: load(Source::Primary)?,
        reference: load(Source::Reference)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn table(label: &str, columns: &[&str], rows: &[&[&str]]) -> RawTable {
        let mut t = RawTable::new(label, columns.iter().map(|c| c.to_string()).collect());
        for r in rows {
            t.push_row(r.iter().map(|v| CellValue::from(*v)).collect());
        }
        t
    }

    #[test]
    fn invalid_threshold_rejected_before_normalizing() {
        let options = ReconOptions { threshold: 0.0, ..ReconOptions::default() };
        let input = ReconInput {
            primary: table("p", &["nope"], &[]),
            reference: table("r", &["nope"], &[]),
        };
        let err = run(&options, &input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
    }

    #[test]
    fn missing_date_in_reference_aborts_whole_run() {
        let input = ReconInput {
            primary: table("ga4.csv", &["date", "transactions"], &[&["2024-01-01", "1"]]),
            reference: table("crm.csv", &["day", "orders"], &[&["2024-01-01", "1"]]),
        };
        let err = run(&ReconOptions::default(), &input).unwrap_err();
        assert!(err.to_string().contains("crm.csv"));
        assert!(err.is_input_error());
    }

    #[test]
    fn meta_carries_labels_and_threshold() {
        let options = ReconOptions {
            name: "GA4 vs CRM".into(),
            threshold: 5.0,
            primary_label: "ga4".into(),
            reference_label: "crm".into(),
            ..ReconOptions::default()
        };
        let result = run_records(&options, &[], &[]).unwrap();
        assert_eq!(result.meta.name, "GA4 vs CRM");
        assert_eq!(result.meta.primary_label, "ga4");
        assert_eq!(result.meta.reference_label, "crm");
        assert_eq!(result.meta.threshold, 5.0);
        assert_eq!(result.summary.threshold, 5.0);
        assert!(result.table.is_empty());
    }

    #[test]
    fn per_source_candidates_are_used() {
        let mut options = ReconOptions::default();
        options.primary_columns.transactions = vec!["ga4_transactions".into()];
        let input = ReconInput {
            primary: table("ga4", &["date", "ga4_transactions"], &[&["2024-01-01", "7"]]),
            reference: table("crm", &["Data", "Orders"], &[&["2024-01-01", "7"]]),
        };
        let result = run(&options, &input).unwrap();
        assert_eq!(result.table[0].primary_transactions, Some(7));
        assert_eq!(result.table[0].reference_transactions, Some(7));
        assert_eq!(result.table[0].transactions_diff, Some(0));
        assert!(result.summary.flagged_dates.is_empty());
    }
}
