// Normalizer: heterogeneous source tables -> canonical per-day records.
// Column resolution is fatal when no date column exists; metric cells are
// coerced tolerantly (a bad cell becomes "not measured", never an abort).

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::ColumnCandidates;
use crate::error::ReconError;
use crate::model::{CanonicalRecord, Metric, Source};
use crate::table::{CellValue, RawTable};

/// Case-insensitive, whitespace-insensitive column name.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Index of the first candidate present in `columns`. Candidates are tried in
/// order, so the candidate list decides priority, not the column order.
pub fn resolve_column(columns: &[String], candidates: &[String]) -> Option<usize> {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_column_name(c)).collect();
    candidates.iter().find_map(|cand| {
        let cand = normalize_column_name(cand);
        normalized.iter().position(|c| *c == cand)
    })
}

/// Date column of `table`, or the fatal error listing what was seen.
pub fn resolve_date_column(table: &RawTable, candidates: &ColumnCandidates) -> Result<usize, ReconError> {
    resolve_column(&table.columns, &candidates.date).ok_or_else(|| ReconError::MissingDateColumn {
        source_label: table.label.clone(),
        tried: candidates.date.clone(),
        seen: table.columns.clone(),
    })
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date cell. Accepts ISO dates, `YYYY/MM/DD`, `DD.MM.YYYY`,
/// `YYYYMMDD` and datetimes (the time part is dropped).
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty => None,
        CellValue::Number(v) => {
            if v.fract() != 0.0 || *v < 0.0 {
                return None;
            }
            NaiveDate::parse_from_str(&format!("{}", *v as u64), "%Y%m%d").ok()
        }
        CellValue::Text(s) => parse_date_str(s.trim()),
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parse a financial number string:
/// - Strip currency symbols, commas, whitespace
/// - Handle `(123.45)` → `-123.45`
/// - Returns None if non-numeric characters remain after stripping
pub fn parse_financial_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(*c, '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    // Only digits, '.', and a leading sign may remain
    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if is_negative { -value } else { value })
}

/// Tolerant metric coercion. Anything outside the canonical domain
/// (non-numeric, negative, fractional count) reads as not measured.
pub fn coerce_metric(metric: Metric, cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Empty => return None,
        CellValue::Number(v) if v.is_finite() => *v,
        CellValue::Number(_) => return None,
        CellValue::Text(s) => parse_financial_number(s)?,
    };
    if value < 0.0 {
        return None;
    }
    if metric.is_count() && value.fract() != 0.0 {
        return None;
    }
    Some(value)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DayAccumulator {
    transactions: Option<u64>,
    revenue: Option<f64>,
    rows: usize,
}

fn add_count(acc: Option<u64>, v: Option<u64>) -> Option<u64> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, b) => a.or(b),
    }
}

fn add_amount(acc: Option<f64>, v: Option<f64>) -> Option<f64> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    }
}

/// Normalize one source table into canonical records, one per date,
/// ascending. Rows sharing a date are summed; absent values contribute
/// nothing. Rows with an empty date cell are skipped.
pub fn normalize(
    source: Source,
    table: &RawTable,
    candidates: &ColumnCandidates,
) -> Result<Vec<CanonicalRecord>, ReconError> {
    let date_idx = resolve_date_column(table, candidates)?;

    let tx_idx = resolve_column(&table.columns, candidates.metric(Metric::Transactions));
    let rev_idx = resolve_column(&table.columns, candidates.metric(Metric::Revenue));

    let date_col = table.columns[date_idx].as_str();
    let tx_col = tx_idx.map(|i| table.columns[i].as_str());
    let rev_col = rev_idx.map(|i| table.columns[i].as_str());
    tracing::debug!(%source, label = %table.label, date = date_col, transactions = ?tx_col, revenue = ?rev_col, "resolved columns");
    for (metric, idx) in [(Metric::Transactions, tx_idx), (Metric::Revenue, rev_idx)] {
        if idx.is_none() {
            let tried = candidates.metric(metric).join(", ");
            tracing::warn!(%source, label = %table.label, %metric, %tried, "no column found; metric not measured");
        }
    }

    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    let mut skipped = 0usize;
    let mut coerced = 0usize;

    for row in 0..table.len() {
        let date_cell = table.cell(row, date_idx);
        if date_cell.is_empty() {
            skipped += 1;
            continue;
        }
        let date = parse_date(date_cell).ok_or_else(|| ReconError::DateParse {
            source_label: table.label.clone(),
            row: row + 1,
            value: match date_cell {
                CellValue::Text(s) => s.clone(),
                CellValue::Number(v) => v.to_string(),
                CellValue::Empty => String::new(),
            },
        })?;

        let mut read = |metric: Metric, idx: Option<usize>| -> Option<f64> {
            let cell = table.cell(row, idx?);
            let value = coerce_metric(metric, cell);
            if value.is_none() && !cell.is_empty() {
                coerced += 1;
                tracing::debug!(%source, label = %table.label, row = row + 1, %metric, cell = ?cell, "cell coerced to unset");
            }
            value
        };
        let transactions = read(Metric::Transactions, tx_idx).map(|v| v as u64);
        let revenue = read(Metric::Revenue, rev_idx);

        let acc = days.entry(date).or_default();
        acc.transactions = add_count(acc.transactions, transactions);
        acc.revenue = add_amount(acc.revenue, revenue);
        acc.rows += 1;
    }

    let collapsed = days.values().filter(|d| d.rows > 1).count();
    if collapsed > 0 {
        tracing::warn!(%source, label = %table.label, dates = collapsed, "multiple rows per date summed");
    }
    if skipped > 0 {
        tracing::warn!(%source, label = %table.label, rows = skipped, "rows without a date skipped");
    }
    if coerced > 0 {
        tracing::warn!(%source, label = %table.label, cells = coerced, "metric cells coerced to unset");
    }

    Ok(days
        .into_iter()
        .map(|(date, acc)| CanonicalRecord {
            date,
            transactions: acc.transactions,
            revenue: acc.revenue,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        let mut t = RawTable::new("crm.csv", columns.iter().map(|c| c.to_string()).collect());
        for r in rows {
            t.push_row(r.iter().map(|v| CellValue::from(*v)).collect());
        }
        t
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_is_case_and_whitespace_insensitive() {
        let cols = names(&["  Order_Date ", "TOTAL"]);
        assert_eq!(resolve_column(&cols, &names(&["date", "order_date"])), Some(0));
        assert_eq!(resolve_column(&cols, &names(&["revenue", "total"])), Some(1));
        assert_eq!(resolve_column(&cols, &names(&["orders"])), None);
    }

    #[test]
    fn resolve_prefers_candidate_order_over_column_order() {
        let cols = names(&["order_date", "data", "date"]);
        let cands = ColumnCandidates::default();
        assert_eq!(resolve_column(&cols, &cands.date), Some(2));
    }

    #[test]
    fn parse_date_formats() {
        let want = Some(d("2024-01-05"));
        for s in ["2024-01-05", "2024/01/05", "05.01.2024", "20240105", "2024-01-05 13:45:00", "2024-01-05T13:45:00Z"] {
            assert_eq!(parse_date(&CellValue::from(s)), want, "format {s}");
        }
        assert_eq!(parse_date(&CellValue::Number(20240105.0)), want);
        assert_eq!(parse_date(&CellValue::from("yesterday")), None);
    }

    #[test]
    fn parse_financial_number_variants() {
        assert_eq!(parse_financial_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_financial_number("$685.00"), Some(685.0));
        assert_eq!(parse_financial_number("(500.00)"), Some(-500.0));
        assert_eq!(parse_financial_number("  42 "), Some(42.0));
        assert_eq!(parse_financial_number("N/A"), None);
        assert_eq!(parse_financial_number(""), None);
    }

    #[test]
    fn coerce_rejects_out_of_domain() {
        assert_eq!(coerce_metric(Metric::Transactions, &CellValue::from("12")), Some(12.0));
        assert_eq!(coerce_metric(Metric::Transactions, &CellValue::from("12.5")), None);
        assert_eq!(coerce_metric(Metric::Revenue, &CellValue::from("12.5")), Some(12.5));
        assert_eq!(coerce_metric(Metric::Revenue, &CellValue::from("-3")), None);
        assert_eq!(coerce_metric(Metric::Revenue, &CellValue::Number(f64::NAN)), None);
        assert_eq!(coerce_metric(Metric::Revenue, &CellValue::from("0")), Some(0.0));
    }

    #[test]
    fn missing_date_column_is_fatal_and_lists_columns() {
        let t = table(&["day", "orders"], &[&["2024-01-01", "3"]]);
        let err = normalize(Source::Reference, &t, &ColumnCandidates::default()).unwrap_err();
        match err {
            ReconError::MissingDateColumn { source_label, seen, tried } => {
                assert_eq!(source_label, "crm.csv");
                assert_eq!(seen, vec!["day", "orders"]);
                assert_eq!(tried[0], "date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_metric_column_yields_unset_not_zero() {
        let t = table(&["Date", "Orders"], &[&["2024-01-01", "3"]]);
        let recs = normalize(Source::Reference, &t, &ColumnCandidates::default()).unwrap();
        assert_eq!(
            recs,
            vec![CanonicalRecord { date: d("2024-01-01"), transactions: Some(3), revenue: None }]
        );
    }

    #[test]
    fn malformed_cell_is_unset_and_batch_survives() {
        let t = table(
            &["date", "transactions", "revenue"],
            &[&["2024-01-01", "abc", "100.50"], &["2024-01-02", "4", "n/a"]],
        );
        let recs = normalize(Source::Reference, &t, &ColumnCandidates::default()).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].transactions, None);
        assert_eq!(recs[0].revenue, Some(100.5));
        assert_eq!(recs[1].transactions, Some(4));
        assert_eq!(recs[1].revenue, None);
    }

    #[test]
    fn unparseable_date_is_fatal() {
        let t = table(&["date", "orders"], &[&["2024-01-01", "1"], &["soon", "2"]]);
        let err = normalize(Source::Primary, &t, &ColumnCandidates::default()).unwrap_err();
        match err {
            ReconError::DateParse { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_dates_are_summed_and_sorted() {
        let t = table(
            &["order_date", "count", "amount"],
            &[
                &["2024-01-02", "1", "10"],
                &["2024-01-01", "2", ""],
                &["2024-01-02", "3", "5.5"],
                &["2024-01-01", "", ""],
            ],
        );
        let recs = normalize(Source::Reference, &t, &ColumnCandidates::default()).unwrap();
        assert_eq!(
            recs,
            vec![
                CanonicalRecord { date: d("2024-01-01"), transactions: Some(2), revenue: None },
                CanonicalRecord { date: d("2024-01-02"), transactions: Some(4), revenue: Some(15.5) },
            ]
        );
    }

    #[test]
    fn blank_date_rows_are_skipped() {
        let t = table(&["date", "orders"], &[&["2024-01-01", "1"], &["", ""]]);
        let recs = normalize(Source::Reference, &t, &ColumnCandidates::default()).unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn empty_table_normalizes_to_nothing() {
        let t = table(&["date"], &[]);
        let recs = normalize(Source::Primary, &t, &ColumnCandidates::default()).unwrap();
        assert!(recs.is_empty());
    }
}
