use chrono::NaiveDate;

/// Structural errors raised by the trend pipeline.
///
/// Any of these aborts the report being generated; other reports in the same
/// run are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub enum TrendError {
    /// Bucketing was asked for a range whose start lies after its end.
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// A metric row failed validation at the ingestion boundary.
    MalformedRow(String),
    /// Two tables being merged expose the same column label.
    DuplicateColumn(String),
    /// A table row does not carry one value per schema column.
    RowWidth {
        bucket: String,
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for TrendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange { start, end } => {
                write!(f, "Invalid range: start {start} is after end {end}")
            }
            Self::MalformedRow(msg) => write!(f, "Malformed row: {msg}"),
            Self::DuplicateColumn(name) => write!(f, "Duplicate column: {name}"),
            Self::RowWidth {
                bucket,
                expected,
                found,
            } => write!(
                f,
                "Row width mismatch: {bucket} has {found} values, schema has {expected} columns"
            ),
        }
    }
}

impl std::error::Error for TrendError {}
