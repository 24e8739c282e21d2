use chrono::NaiveDate;

use crate::model::{
    AlignedRow, DeviationResult, FlaggedDay, Metric, MetricSummary, ReconciliationSummary,
    ReportPeriod,
};

/// Summarize one metric. Totals sum present values only (`None` if nothing
/// was ever present). The mean covers days with a defined `diff_pct`.
pub fn summarize_metric(
    metric: Metric,
    rows: &[AlignedRow],
    deviations: &[DeviationResult],
) -> MetricSummary {
    let mut primary_total: Option<f64> = None;
    let mut reference_total: Option<f64> = None;
    let mut pct_sum = 0.0;
    let mut compared_days = 0;
    let mut flagged = Vec::new();

    for (row, dev) in rows.iter().zip(deviations) {
        let pair = row.metric(metric);
        if let Some(p) = pair.primary {
            primary_total = Some(primary_total.unwrap_or(0.0) + p);
        }
        if let Some(r) = pair.reference {
            reference_total = Some(reference_total.unwrap_or(0.0) + r);
        }

        let dev = dev.metric(metric);
        if let Some(pct) = dev.diff_pct {
            pct_sum += pct;
            compared_days += 1;
            if dev.flagged {
                flagged.push(FlaggedDay {
                    date: row.date,
                    primary: pair.primary,
                    reference: pair.reference,
                    diff_pct: pct,
                });
            }
        }
    }

    MetricSummary {
        metric,
        primary_total,
        reference_total,
        compared_days,
        mean_diff_pct: (compared_days > 0).then(|| pct_sum / compared_days as f64),
        flagged_count: flagged.len(),
        flagged,
    }
}

/// Build the run summary. `rows` and `deviations` must be index-aligned and
/// ascending by date, which is what `align` + `compute_deviations` produce.
pub fn summarize(
    rows: &[AlignedRow],
    deviations: &[DeviationResult],
    threshold: f64,
    requested: (Option<NaiveDate>, Option<NaiveDate>),
) -> ReconciliationSummary {
    debug_assert_eq!(rows.len(), deviations.len());

    let period = ReportPeriod {
        requested_start: requested.0,
        requested_end: requested.1,
        first_date: rows.first().map(|r| r.date),
        last_date: rows.last().map(|r| r.date),
    };

    let flagged_dates: Vec<NaiveDate> = deviations
        .iter()
        .filter(|d| d.is_flagged())
        .map(|d| d.date)
        .collect();

    ReconciliationSummary {
        threshold,
        period,
        days: rows.len(),
        transactions: summarize_metric(Metric::Transactions, rows, deviations),
        revenue: summarize_metric(Metric::Revenue, rows, deviations),
        flagged_dates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::compute_deviations;
    use crate::model::MetricPair;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(date: &str, tx: (Option<f64>, Option<f64>), rev: (Option<f64>, Option<f64>)) -> AlignedRow {
        AlignedRow {
            date: d(date),
            transactions: MetricPair { primary: tx.0, reference: tx.1 },
            revenue: MetricPair { primary: rev.0, reference: rev.1 },
        }
    }

    #[test]
    fn totals_ignore_absent_values() {
        let rows = vec![
            row("2024-01-01", (Some(10.0), Some(9.0)), (None, None)),
            row("2024-01-02", (Some(12.0), None), (None, None)),
        ];
        let devs = compute_deviations(&rows, 10.0);
        let s = summarize(&rows, &devs, 10.0, (None, None));

        assert_eq!(s.transactions.primary_total, Some(22.0));
        assert_eq!(s.transactions.reference_total, Some(9.0));
        assert_eq!(s.revenue.primary_total, None);
        assert_eq!(s.revenue.reference_total, None);
    }

    #[test]
    fn mean_excludes_days_without_pct() {
        let rows = vec![
            row("2024-01-01", (Some(11.0), Some(10.0)), (None, None)),
            row("2024-01-02", (Some(5.0), Some(0.0)), (None, None)),
            row("2024-01-03", (Some(9.0), Some(10.0)), (None, None)),
            row("2024-01-04", (None, Some(10.0)), (None, None)),
        ];
        let devs = compute_deviations(&rows, 10.0);
        let s = summarize(&rows, &devs, 10.0, (None, None));
        assert_eq!(s.transactions.compared_days, 2);
        let mean = s.transactions.mean_diff_pct.unwrap();
        assert!(mean.abs() < 1e-9, "mean was {mean}");
        assert_eq!(s.revenue.mean_diff_pct, None);
    }

    #[test]
    fn flagged_dates_are_chronological_and_deduplicated() {
        let rows = vec![
            row("2024-01-01", (Some(20.0), Some(10.0)), (Some(200.0), Some(100.0))),
            row("2024-01-02", (Some(10.0), Some(10.0)), (Some(100.0), Some(100.0))),
            row("2024-01-03", (Some(10.0), Some(10.0)), (Some(50.0), Some(100.0))),
        ];
        let devs = compute_deviations(&rows, 10.0);
        let s = summarize(&rows, &devs, 10.0, (None, None));

        assert_eq!(s.flagged_dates, vec![d("2024-01-01"), d("2024-01-03")]);
        assert_eq!(s.transactions.flagged_count, 1);
        assert_eq!(s.revenue.flagged_count, 2);
        assert_eq!(s.revenue.flagged[1].date, d("2024-01-03"));
        assert_eq!(s.revenue.flagged[1].diff_pct, -50.0);
    }

    #[test]
    fn period_reports_requested_and_observed_range() {
        let rows = vec![
            row("2024-01-03", (Some(1.0), Some(1.0)), (None, None)),
            row("2024-01-09", (Some(1.0), Some(1.0)), (None, None)),
        ];
        let devs = compute_deviations(&rows, 10.0);
        let s = summarize(&rows, &devs, 10.0, (Some(d("2024-01-01")), Some(d("2024-01-31"))));
        assert_eq!(s.period.requested_start, Some(d("2024-01-01")));
        assert_eq!(s.period.requested_end, Some(d("2024-01-31")));
        assert_eq!(s.period.first_date, Some(d("2024-01-03")));
        assert_eq!(s.period.last_date, Some(d("2024-01-09")));
    }

    #[test]
    fn empty_run_is_valid() {
        let s = summarize(&[], &[], 10.0, (None, None));
        assert_eq!(s.days, 0);
        assert!(s.flagged_dates.is_empty());
        assert_eq!(s.transactions.flagged_count, 0);
        assert_eq!(s.transactions.compared_days, 0);
        assert_eq!(s.transactions.mean_diff_pct, None);
        assert_eq!(s.period.first_date, None);
    }
}
