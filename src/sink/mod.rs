pub mod json;

use crate::trend::chart::ChartSpec;
use crate::trend::classify::TrendAnnotations;
use crate::trend::table::SeriesTable;
use serde::Serialize;

pub use json::JsonDirSink;

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl Cell {
    /// Whole numbers are stored as integers so counts render without a
    /// fractional part.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn number(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
            Self::Integer(value as i64)
        } else {
            Self::Number(value)
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::number(v)
    }
}

/// A fully built sheet: header, value rows and render metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetDocument {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendAnnotations>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<ChartSpec>,
}

impl SheetDocument {
    /// Bucket label followed by every numeric column, most recent month first.
    pub fn from_table(title: impl Into<String>, table: &SeriesTable) -> Self {
        let rows = table
            .rows()
            .iter()
            .map(|row| {
                std::iter::once(Cell::Text(row.bucket.label()))
                    .chain(row.values.iter().map(|v| Cell::number(*v)))
                    .collect()
            })
            .collect();
        Self {
            title: title.into(),
            header: table.schema().header(),
            rows,
            trend: None,
            charts: Vec::new(),
        }
    }

    /// A flat table that is not a time series.
    pub fn from_rows(title: impl Into<String>, header: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            title: title.into(),
            header,
            rows,
            trend: None,
            charts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_trend(mut self, trend: TrendAnnotations) -> Self {
        self.trend = Some(trend);
        self
    }

    #[must_use]
    pub fn with_chart(mut self, chart: ChartSpec) -> Self {
        self.charts.push(chart);
        self
    }
}

/// Destination for finished documents.
pub trait ReportSink {
    fn publish(&mut self, document: &SheetDocument) -> Result<(), SinkError>;
}

#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Serialize(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialize(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e)
    }
}
