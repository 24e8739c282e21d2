// Reporter: structured per-day table + condensed human-readable summary.
// Rounding to 2 decimals happens here and nowhere upstream.

use std::fmt::{self, Write as _};

use chrono::NaiveDate;
use serde::Serialize;

use crate::deviation::round2;
use crate::model::{AlignedRow, DeviationResult, Metric, MetricSummary, ReconResult};

/// Column order of the structured table and its delimited export.
pub const TABLE_COLUMNS: [&str; 11] = [
    "date",
    "primary_transactions",
    "reference_transactions",
    "transactions_diff",
    "transactions_diff_pct",
    "transactions_flag",
    "primary_revenue",
    "reference_revenue",
    "revenue_diff",
    "revenue_diff_pct",
    "revenue_flag",
];

/// One exported row. Field order matches [`TABLE_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub date: NaiveDate,
    pub primary_transactions: Option<u64>,
    pub reference_transactions: Option<u64>,
    pub transactions_diff: Option<i64>,
    pub transactions_diff_pct: Option<f64>,
    pub transactions_flag: bool,
    pub primary_revenue: Option<f64>,
    pub reference_revenue: Option<f64>,
    pub revenue_diff: Option<f64>,
    pub revenue_diff_pct: Option<f64>,
    pub revenue_flag: bool,
}

pub fn build_table(rows: &[AlignedRow], deviations: &[DeviationResult]) -> Vec<TableRow> {
    rows.iter()
        .zip(deviations)
        .map(|(row, dev)| TableRow {
            date: row.date,
            primary_transactions: row.transactions.primary.map(|v| v as u64),
            reference_transactions: row.transactions.reference.map(|v| v as u64),
            transactions_diff: dev.transactions.diff.map(|v| v.round() as i64),
            transactions_diff_pct: dev.transactions.diff_pct.map(round2),
            transactions_flag: dev.transactions.flagged,
            primary_revenue: row.revenue.primary,
            reference_revenue: row.revenue.reference,
            revenue_diff: dev.revenue.diff.map(round2),
            revenue_diff_pct: dev.revenue.diff_pct.map(round2),
            revenue_flag: dev.revenue.flagged,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Human-readable summary
// ---------------------------------------------------------------------------

const RULE_WIDTH: usize = 70;

/// Insert `,` thousands separators into a fixed-decimals rendering.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut grouped = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    // no sign on values that round to zero
    if value < 0.0 && grouped.chars().any(|c| c.is_ascii_digit() && c != '0') {
        grouped.insert(0, '-');
    }
    grouped
}

fn metric_decimals(metric: Metric) -> usize {
    if metric.is_count() {
        0
    } else {
        2
    }
}

fn opt_value(value: Option<f64>, metric: Metric) -> String {
    value
        .map(|v| format_grouped(v, metric_decimals(metric)))
        .unwrap_or_else(|| "n/a".into())
}

fn write_metric_section<W: fmt::Write>(
    out: &mut W,
    s: &MetricSummary,
    primary: &str,
    reference: &str,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}:", s.metric.name().to_uppercase())?;
    writeln!(out, "   {primary} total:  {}", opt_value(s.primary_total, s.metric))?;
    writeln!(out, "   {reference} total:  {}", opt_value(s.reference_total, s.metric))?;
    match s.mean_diff_pct {
        Some(mean) => writeln!(
            out,
            "   Mean deviation: {:+.2}% ({} day{} compared)",
            round2(mean),
            s.compared_days,
            if s.compared_days == 1 { "" } else { "s" }
        )?,
        None => writeln!(out, "   Mean deviation: n/a (no comparable days)")?,
    }
    writeln!(out, "   Days over threshold: {}", s.flagged_count)?;
    if !s.flagged.is_empty() {
        writeln!(out, "   Flagged days:")?;
        for day in &s.flagged {
            writeln!(
                out,
                "      {}: {primary}={}, {reference}={}, diff={:+.2}%",
                day.date,
                opt_value(day.primary, s.metric),
                opt_value(day.reference, s.metric),
                round2(day.diff_pct),
            )?;
        }
    }
    Ok(())
}

/// Write the condensed report: window, totals, mean deviation and flagged days.
pub fn write_summary<W: fmt::Write>(out: &mut W, result: &ReconResult) -> fmt::Result {
    let s = &result.summary;
    let primary = result.meta.primary_label.as_str();
    let reference = result.meta.reference_label.as_str();
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out, "{rule}")?;
    writeln!(out, "RECONCILIATION: {} ({primary} vs {reference})", result.meta.name)?;
    writeln!(out, "{rule}")?;

    match (s.period.first_date, s.period.last_date) {
        (Some(first), Some(last)) => writeln!(out, "Period: {first} – {last}")?,
        _ => writeln!(out, "Period: (no data)")?,
    }
    if s.period.requested_start.is_some() || s.period.requested_end.is_some() {
        let show = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "…".into());
        writeln!(
            out,
            "Requested: {} – {}",
            show(s.period.requested_start),
            show(s.period.requested_end)
        )?;
    }
    writeln!(out, "Days in analysis: {}", s.days)?;
    writeln!(out, "Threshold: {:.2}%", s.threshold)?;

    for metric in Metric::ALL {
        write_metric_section(out, s.metric(metric), primary, reference)?;
    }

    writeln!(out)?;
    if s.flagged_dates.is_empty() {
        writeln!(out, "No days over threshold.")?;
    } else {
        let dates: Vec<String> = s.flagged_dates.iter().map(|d| d.to_string()).collect();
        writeln!(out, "Flagged dates ({}): {}", dates.len(), dates.join(", "))?;
    }
    writeln!(out, "{rule}")
}

/// The condensed report as a string.
pub fn render_summary(result: &ReconResult) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_summary(&mut out, result);
    out
}
