// Generic tabular input: column names + rows of text/numeric cells.
// Delimited-file loading lives here too so callers hand the engine plain values.

use std::collections::HashMap;
use std::path::Path;

use encoding_rs::Encoding;
use serde::Serialize;

use crate::error::ReconError;

/// A single input cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

/// Rows of cells under a header. Rows shorter than the header read as empty
/// cells in the missing positions.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Source label used in diagnostics (file path, feed name).
    pub label: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(label: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            label: label.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// Build a table from column→value records. Columns appear in first-seen
    /// order; a record lacking a column gets an empty cell there.
    pub fn from_records<I, R, K>(label: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, CellValue)>,
        K: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut rows: Vec<Vec<CellValue>> = Vec::new();

        for record in records {
            let mut row: Vec<CellValue> = vec![CellValue::Empty; columns.len()];
            for (key, value) in record {
                let key = key.into();
                let col = match index.get(&key) {
                    Some(&i) => i,
                    None => {
                        columns.push(key.clone());
                        index.insert(key, columns.len() - 1);
                        columns.len() - 1
                    }
                };
                if row.len() <= col {
                    row.resize(col + 1, CellValue::Empty);
                }
                row[col] = value;
            }
            rows.push(row);
        }

        Self {
            label: label.into(),
            columns,
            rows,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Delimited file loading
// ---------------------------------------------------------------------------

/// Read a delimited file into a table, decoding non-UTF-8 bytes with `fallback`.
pub fn read_table(
    path: &Path,
    label: &str,
    fallback: &'static Encoding,
) -> Result<RawTable, ReconError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    let content = decode_bytes(bytes, fallback);
    load_csv_table(label, &content)
}

/// Decode file bytes: UTF-8 first, then the fallback encoding (CRM exports
/// are often Windows-125x).
pub fn decode_bytes(bytes: Vec<u8>, fallback: &'static Encoding) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = fallback.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// Parse delimited text with a header row. The delimiter is sniffed.
pub fn load_csv_table(label: &str, content: &str) -> Result<RawTable, ReconError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let delimiter = sniff_delimiter(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let csv_err = |e: csv::Error| ReconError::Csv {
        source_label: label.to_string(),
        message: e.to_string(),
    };

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut table = RawTable::new(label, columns);
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        table.push_row(record.iter().map(CellValue::from).collect());
    }

    let delimiter_shown = (delimiter as char).escape_default().to_string();
    tracing::debug!(
        source = label,
        delimiter = %delimiter_shown,
        columns = table.columns.len(),
        rows = table.len(),
        "loaded table"
    );

    Ok(table)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // First line must split into >1 field
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}
