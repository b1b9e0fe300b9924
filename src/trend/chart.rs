use crate::trend::table::{SeriesTable, BUCKET_COLUMN};
use serde::Serialize;

/// Padding applied above the largest plotted value.
const AXIS_MAX_PADDING: f64 = 1.1;
/// Padding applied below the smallest plotted value.
const AXIS_MIN_PADDING: f64 = 0.9;

/// Vertical axis window for a chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// Axis window covering `columns` of `table` with 10% padding on both ends.
///
/// The lower bound never goes below zero. Column names that are not in the
/// table are ignored; with nothing to plot the range is `0..0`.
pub fn build_axis_range(table: &SeriesTable, columns: &[&str]) -> AxisRange {
    let values: Vec<f64> = columns
        .iter()
        .filter_map(|name| table.column_values(name))
        .flatten()
        .collect();
    if values.is_empty() {
        return AxisRange::default();
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    AxisRange {
        min: (min * AXIS_MIN_PADDING).max(0.0),
        max: max * AXIS_MAX_PADDING,
    }
}

/// RGB colour with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Rgb {
    const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }
}

/// Line colours assigned to series in column order; cycles past the end.
pub const PALETTE: [Rgb; 10] = [
    Rgb::new(0.4, 0.4, 1.0),
    Rgb::new(1.0, 0.4, 0.4),
    Rgb::new(0.4, 1.0, 0.4),
    Rgb::new(1.0, 0.8, 0.2),
    Rgb::new(0.8, 0.4, 0.8),
    Rgb::new(0.4, 0.8, 1.0),
    Rgb::new(1.0, 0.6, 0.4),
    Rgb::new(0.6, 0.4, 0.2),
    Rgb::new(0.8, 0.8, 0.4),
    Rgb::new(0.4, 0.8, 0.6),
];

const LINE_WIDTH: u8 = 2;

/// One plotted line: which sheet column feeds it and how it is drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDescriptor {
    pub column: String,
    /// Zero-based sheet column, counting the bucket column as 0.
    pub column_index: usize,
    pub color: Rgb,
    pub line_width: u8,
}

/// Render metadata for a line chart over a finished table. Sheet identifiers
/// are assigned by the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_range: Option<AxisRange>,
    /// Rows covered by the domain and series, header row included.
    pub row_count: usize,
    /// Domain is listed newest first, so the chart reverses it.
    pub reversed_domain: bool,
    /// Zero-based sheet column where the chart is anchored.
    pub anchor_column: usize,
    pub series: Vec<SeriesDescriptor>,
}

/// What to plot and how to title it.
#[derive(Debug, Clone, Default)]
pub struct ChartOptions {
    pub title: String,
    pub y_axis_title: String,
    /// Columns to plot; `None` plots every numeric column.
    pub columns: Option<Vec<String>>,
    /// Plot at most this many series.
    pub max_series: Option<usize>,
    /// Columns whose values bound the vertical axis window.
    pub axis_columns: Option<Vec<String>>,
}

impl ChartOptions {
    pub fn new(title: impl Into<String>, y_axis_title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            y_axis_title: y_axis_title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn max_series(mut self, max: usize) -> Self {
        self.max_series = Some(max);
        self
    }

    #[must_use]
    pub fn axis_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axis_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Derive a chart description from a finished table.
pub fn build_chart(table: &SeriesTable, options: &ChartOptions) -> ChartSpec {
    let schema = table.schema();
    let selected: Vec<(usize, &str)> = match &options.columns {
        Some(names) => names
            .iter()
            .filter_map(|name| schema.position(name).map(|i| (i, name.as_str())))
            .collect(),
        None => schema.labels().into_iter().enumerate().collect(),
    };
    let limit = options.max_series.unwrap_or(usize::MAX);

    let series = selected
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(n, (i, name))| SeriesDescriptor {
            column: name.to_string(),
            column_index: i + 1,
            color: PALETTE[n % PALETTE.len()],
            line_width: LINE_WIDTH,
        })
        .collect();

    let axis_range = options.axis_columns.as_ref().map(|names| {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        build_axis_range(table, &names)
    });

    ChartSpec {
        title: options.title.clone(),
        x_axis_title: BUCKET_COLUMN.to_string(),
        y_axis_title: options.y_axis_title.clone(),
        axis_range,
        row_count: table.len() + 1,
        reversed_domain: true,
        anchor_column: schema.len() + 1 + 2,
        series,
    }
}
