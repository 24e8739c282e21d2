use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, empty candidate list, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// No candidate date column found in a source table.
    #[error("source '{source_label}': no date column found (tried {tried:?}); available columns: {seen:?}")]
    MissingDateColumn {
        source_label: String,
        tried: Vec<String>,
        seen: Vec<String>,
    },
    /// Date cell could not be parsed. `row` is 1-based, header excluded.
    #[error("source '{source_label}', row {row}: cannot parse date '{value}'")]
    DateParse {
        source_label: String,
        row: usize,
        value: String,
    },
    /// Malformed delimited input.
    #[error("source '{source_label}': {message}")]
    Csv { source_label: String, message: String },
    /// IO error (file read, export write, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

impl ReconError {
    /// True for errors caused by the input tables rather than config or IO.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingDateColumn { .. } | Self::DateParse { .. } | Self::Csv { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_date_column_lists_seen_columns() {
        let err = ReconError::MissingDateColumn {
            source_label: "crm".into(),
            tried: vec!["date".into(), "data".into()],
            seen: vec!["day".into(), "orders".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'crm'"));
        assert!(msg.contains("\"day\""));
        assert!(msg.contains("\"orders\""));
        assert!(err.is_input_error());
    }

    #[test]
    fn io_is_not_input_error() {
        assert!(!ReconError::Io("boom".into()).is_input_error());
    }
}
