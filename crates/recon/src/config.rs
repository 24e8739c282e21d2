use chrono::NaiveDate;
use encoding_rs::Encoding;
use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{Metric, Source};

pub const DEFAULT_THRESHOLD: f64 = 10.0;

pub const DEFAULT_DATE_COLUMNS: &[&str] = &["date", "data", "transaction_date", "order_date"];
pub const DEFAULT_TRANSACTION_COLUMNS: &[&str] = &["transactions", "orders", "count"];
pub const DEFAULT_REVENUE_COLUMNS: &[&str] = &["revenue", "total", "amount", "value"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub period: Option<PeriodConfig>,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Reporting window. Describes the run; never filters rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PeriodConfig {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub primary: SourceConfig,
    pub reference: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, source: Source) -> &SourceConfig {
        match source {
            Source::Primary => &self.primary,
            Source::Reference => &self.reference,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub label: Option<String>,
    pub file: String,
    /// Fallback encoding label for non-UTF-8 files (WHATWG label).
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub columns: ColumnOverrides,
}

impl SourceConfig {
    pub fn label_or(&self, source: Source) -> String {
        self.label.clone().unwrap_or_else(|| source.to_string())
    }

    /// Resolved fallback encoding. Windows-1252 when unset.
    pub fn fallback_encoding(&self) -> Result<&'static Encoding, ReconError> {
        match self.encoding.as_deref() {
            None => Ok(encoding_rs::WINDOWS_1252),
            Some(label) => Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
                ReconError::ConfigValidation(format!("unknown encoding '{label}'"))
            }),
        }
    }
}

/// Per-source replacements for the default candidate lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnOverrides {
    #[serde(default)]
    pub date: Option<Vec<String>>,
    #[serde(default)]
    pub transactions: Option<Vec<String>>,
    #[serde(default)]
    pub revenue: Option<Vec<String>>,
}

impl ColumnOverrides {
    /// Apply one `FIELD=NAME` assignment. Repeating a field appends another
    /// candidate, tried in the order given.
    pub fn push_assignment(&mut self, assignment: &str) -> Result<(), ReconError> {
        let (field, name) = assignment.split_once('=').ok_or_else(|| {
            ReconError::ConfigValidation(format!("column override '{assignment}' must be FIELD=NAME"))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "column override '{assignment}' has an empty column name"
            )));
        }
        let slot = match field.trim().to_lowercase().as_str() {
            "date" => &mut self.date,
            "transactions" => &mut self.transactions,
            "revenue" => &mut self.revenue,
            other => {
                return Err(ReconError::ConfigValidation(format!(
                    "unknown column field '{other}' (expected date, transactions or revenue)"
                )))
            }
        };
        slot.get_or_insert_with(Vec::new).push(name.to_string());
        Ok(())
    }

    pub fn from_assignments<I>(assignments: I) -> Result<Self, ReconError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut overrides = Self::default();
        for assignment in assignments {
            overrides.push_assignment(assignment.as_ref())?;
        }
        Ok(overrides)
    }
}

// ---------------------------------------------------------------------------
// Column candidates
// ---------------------------------------------------------------------------

/// Ordered candidate names per canonical field. First match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCandidates {
    pub date: Vec<String>,
    pub transactions: Vec<String>,
    pub revenue: Vec<String>,
}

impl Default for ColumnCandidates {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<String>>();
        Self {
            date: owned(DEFAULT_DATE_COLUMNS),
            transactions: owned(DEFAULT_TRANSACTION_COLUMNS),
            revenue: owned(DEFAULT_REVENUE_COLUMNS),
        }
    }
}

impl ColumnCandidates {
    pub fn with_overrides(overrides: &ColumnOverrides) -> Self {
        let mut c = Self::default();
        if let Some(ref date) = overrides.date {
            c.date = date.clone();
        }
        if let Some(ref tx) = overrides.transactions {
            c.transactions = tx.clone();
        }
        if let Some(ref rev) = overrides.revenue {
            c.revenue = rev.clone();
        }
        c
    }

    pub fn metric(&self, metric: Metric) -> &[String] {
        match metric {
            Metric::Transactions => &self.transactions,
            Metric::Revenue => &self.revenue,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

pub fn validate_threshold(threshold: f64) -> Result<(), ReconError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ReconError::ConfigValidation(format!(
            "threshold must be a positive number, got {threshold}"
        )));
    }
    Ok(())
}

pub fn validate_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ReconError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ReconError::ConfigValidation(format!(
                "period start {start} is after end {end}"
            )));
        }
    }
    Ok(())
}

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        validate_threshold(self.threshold)?;

        if let Some(period) = self.period {
            validate_period(period.start, period.end)?;
        }

        for source in [Source::Primary, Source::Reference] {
            let sc = self.sources.get(source);
            if sc.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{source}': file must not be empty"
                )));
            }
            sc.fallback_encoding()?;

            let overrides = [
                ("date", &sc.columns.date),
                ("transactions", &sc.columns.transactions),
                ("revenue", &sc.columns.revenue),
            ];
            for (field, list) in overrides {
                if let Some(list) = list {
                    if list.is_empty() || list.iter().any(|c| c.trim().is_empty()) {
                        return Err(ReconError::ConfigValidation(format!(
                            "source '{source}': columns.{field} must list at least one non-empty name"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn candidates(&self, source: Source) -> ColumnCandidates {
        ColumnCandidates::with_overrides(&self.sources.get(source).columns)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
