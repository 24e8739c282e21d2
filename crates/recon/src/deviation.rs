use crate::model::{AlignedRow, DeviationResult, MetricDeviation, MetricPair};

/// Deviation of one metric on one day.
///
/// - `diff` needs both values.
/// - `diff_pct` needs a present, non-zero reference. A zero reference makes
///   the percentage meaningless, so it stays unset rather than infinite.
/// - `flagged` only when `diff_pct` is present and its 2-decimal rounding
///   exceeds `threshold` in magnitude, so the flag agrees with the reported
///   percentage.
///
/// `diff` and `diff_pct` stay unrounded; the report rounds them.
pub fn metric_deviation(pair: &MetricPair, threshold: f64) -> MetricDeviation {
    let diff = match (pair.primary, pair.reference) {
        (Some(p), Some(r)) => Some(p - r),
        _ => None,
    };
    let diff_pct = match (diff, pair.reference) {
        (Some(diff), Some(r)) if r != 0.0 => Some(diff / r * 100.0),
        _ => None,
    };
    let flagged = diff_pct.is_some_and(|pct| round2(pct).abs() > threshold);

    MetricDeviation {
        diff,
        diff_pct,
        flagged,
    }
}

pub fn row_deviation(row: &AlignedRow, threshold: f64) -> DeviationResult {
    DeviationResult {
        date: row.date,
        transactions: metric_deviation(&row.transactions, threshold),
        revenue: metric_deviation(&row.revenue, threshold),
    }
}

/// One result per aligned row, same order.
pub fn compute_deviations(rows: &[AlignedRow], threshold: f64) -> Vec<DeviationResult> {
    let results: Vec<DeviationResult> = rows.iter().map(|r| row_deviation(r, threshold)).collect();
    tracing::info!(
        days = results.len(),
        flagged = results.iter().filter(|r| r.is_flagged()).count(),
        threshold,
        "computed deviations"
    );
    results
}

/// Round half away from zero to 2 decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
