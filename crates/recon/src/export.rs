use std::io::Write;
use std::path::Path;

use crate::error::ReconError;
use crate::model::ReconResult;
use crate::report::{TableRow, TABLE_COLUMNS};

/// Write the structured table as CSV: one header row, then one row per date
/// in table order. Unset cells are empty.
pub fn write_csv<W: Write>(table: &[TableRow], writer: W) -> Result<(), ReconError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let err = |e: csv::Error| ReconError::Io(format!("CSV write error: {e}"));

    wtr.write_record(TABLE_COLUMNS).map_err(err)?;
    for row in table {
        wtr.serialize(row).map_err(err)?;
    }
    wtr.flush()
        .map_err(|e| ReconError::Io(format!("CSV write error: {e}")))?;
    Ok(())
}

/// Write the table to `path`, creating parent directories.
pub fn export_csv(table: &[TableRow], path: &Path) -> Result<(), ReconError> {
    let file = create_file(path)?;
    write_csv(table, file)?;
    tracing::info!(path = %path.display(), rows = table.len(), "exported CSV");
    Ok(())
}

pub fn to_json_string(result: &ReconResult) -> Result<String, ReconError> {
    serde_json::to_string_pretty(result)
        .map_err(|e| ReconError::Io(format!("JSON serialization error: {e}")))
}

pub fn export_json(result: &ReconResult, path: &Path) -> Result<(), ReconError> {
    let json = to_json_string(result)?;
    let mut file = create_file(path)?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "exported JSON");
    Ok(())
}

fn create_file(path: &Path) -> Result<std::fs::File, ReconError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", parent.display())))?;
    }
    std::fs::File::create(path)
        .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn row(date: &str) -> TableRow {
        TableRow {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            primary_transactions: Some(10),
            reference_transactions: Some(9),
            transactions_diff: Some(1),
            transactions_diff_pct: Some(11.11),
            transactions_flag: true,
            primary_revenue: Some(1000.5),
            reference_revenue: None,
            revenue_diff: None,
            revenue_diff_pct: None,
            revenue_flag: false,
        }
    }

    #[test]
    fn csv_has_header_and_empty_unset_cells() {
        let mut buf = Vec::new();
        write_csv(&[row("2024-01-01")], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], TABLE_COLUMNS.join(","));
        assert_eq!(lines[1], "2024-01-01,10,9,1,11.11,true,1000.5,,,,false");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn empty_table_still_writes_header() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim_end(), TABLE_COLUMNS.join(","));
    }

    #[test]
    fn export_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/nested/recon.csv");
        export_csv(&[row("2024-01-01"), row("2024-01-02")], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
