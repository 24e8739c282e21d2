use chrono::NaiveDate;
use serde::Serialize;

use crate::report::TableRow;
use crate::table::RawTable;

// ---------------------------------------------------------------------------
// Sources + metrics
// ---------------------------------------------------------------------------

/// Which feed a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The analytics pipeline (measured side).
    Primary,
    /// The independent ledger the primary is checked against.
    Reference,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// A tracked per-day metric. New metrics get a variant here plus a field on
/// the per-metric structs below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Transactions,
    Revenue,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Transactions, Metric::Revenue];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Revenue => "revenue",
        }
    }

    /// Counts must be whole numbers; amounts may carry decimals.
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Transactions)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Normalized per-day measurement. `None` means "not measured", which is
/// distinct from a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub date: NaiveDate,
    pub transactions: Option<u64>,
    pub revenue: Option<f64>,
}

impl CanonicalRecord {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Transactions => self.transactions.map(|v| v as f64),
            Metric::Revenue => self.revenue,
        }
    }
}

/// Raw tables for both sides of a run.
#[derive(Debug, Clone)]
pub struct ReconInput {
    pub primary: RawTable,
    pub reference: RawTable,
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Primary and reference value of one metric on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricPair {
    pub primary: Option<f64>,
    pub reference: Option<f64>,
}

/// One row of the outer join, unique per date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub transactions: MetricPair,
    pub revenue: MetricPair,
}

impl AlignedRow {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            transactions: MetricPair::default(),
            revenue: MetricPair::default(),
        }
    }

    pub fn metric(&self, metric: Metric) -> &MetricPair {
        match metric {
            Metric::Transactions => &self.transactions,
            Metric::Revenue => &self.revenue,
        }
    }

    pub fn metric_mut(&mut self, metric: Metric) -> &mut MetricPair {
        match metric {
            Metric::Transactions => &mut self.transactions,
            Metric::Revenue => &mut self.revenue,
        }
    }
}

// ---------------------------------------------------------------------------
// Deviation
// ---------------------------------------------------------------------------

/// Unrounded deviation of one metric on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricDeviation {
    pub diff: Option<f64>,
    pub diff_pct: Option<f64>,
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationResult {
    pub date: NaiveDate,
    pub transactions: MetricDeviation,
    pub revenue: MetricDeviation,
}

impl DeviationResult {
    pub fn metric(&self, metric: Metric) -> &MetricDeviation {
        match metric {
            Metric::Transactions => &self.transactions,
            Metric::Revenue => &self.revenue,
        }
    }

    /// A day is flagged when any metric is.
    pub fn is_flagged(&self) -> bool {
        Metric::ALL.iter().any(|m| self.metric(*m).flagged)
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Reporting window. The requested range only describes the run; the
/// observed range comes from the aligned rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportPeriod {
    pub requested_start: Option<NaiveDate>,
    pub requested_end: Option<NaiveDate>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedDay {
    pub date: NaiveDate,
    pub primary: Option<f64>,
    pub reference: Option<f64>,
    pub diff_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: Metric,
    /// Sum over days where the value is present; `None` if never present.
    pub primary_total: Option<f64>,
    pub reference_total: Option<f64>,
    /// Days with a defined percentage deviation.
    pub compared_days: usize,
    pub mean_diff_pct: Option<f64>,
    pub flagged_count: usize,
    pub flagged: Vec<FlaggedDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    pub threshold: f64,
    pub period: ReportPeriod,
    pub days: usize,
    pub transactions: MetricSummary,
    pub revenue: MetricSummary,
    /// Dates with at least one flagged metric, ascending.
    pub flagged_dates: Vec<NaiveDate>,
}

impl ReconciliationSummary {
    pub fn metric(&self, metric: Metric) -> &MetricSummary {
        match metric {
            Metric::Transactions => &self.transactions,
            Metric::Revenue => &self.revenue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub primary_label: String,
    pub reference_label: String,
    pub threshold: f64,
    pub engine_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconciliationSummary,
    pub table: Vec<TableRow>,
    #[serde(skip)]
    pub aligned: Vec<AlignedRow>,
    #[serde(skip)]
    pub deviations: Vec<DeviationResult>,
}
