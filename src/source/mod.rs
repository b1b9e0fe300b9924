pub mod database;
pub mod paginate;
pub mod rows;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use database::DuckDbSource;
pub use paginate::fetch_all;

/// Something a report can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Year,
    Month,
    PagePath,
    PageTitle,
    SessionSource,
    SessionMedium,
    Country,
    Hostname,
}

impl Dimension {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::PagePath => "pagePath",
            Self::PageTitle => "pageTitle",
            Self::SessionSource => "sessionSource",
            Self::SessionMedium => "sessionMedium",
            Self::Country => "country",
            Self::Hostname => "hostname",
        }
    }
}

/// Something a report can count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    ScreenPageViews,
    TotalUsers,
    ActiveUsers,
    NewUsers,
    EventCount,
    Sessions,
    EngagedSessions,
}

impl Metric {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ScreenPageViews => "screenPageViews",
            Self::TotalUsers => "totalUsers",
            Self::ActiveUsers => "activeUsers",
            Self::NewUsers => "newUsers",
            Self::EventCount => "eventCount",
            Self::Sessions => "sessions",
            Self::EngagedSessions => "engagedSessions",
        }
    }
}

/// What a sort key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    Metric(Metric),
    Dimension(Dimension),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub key: OrderKey,
    pub descending: bool,
}

impl OrderBy {
    pub const fn metric_desc(metric: Metric) -> Self {
        Self {
            key: OrderKey::Metric(metric),
            descending: true,
        }
    }

    pub const fn metric_asc(metric: Metric) -> Self {
        Self {
            key: OrderKey::Metric(metric),
            descending: false,
        }
    }

    pub const fn dimension_asc(dimension: Dimension) -> Self {
        Self {
            key: OrderKey::Dimension(dimension),
            descending: false,
        }
    }
}

/// Row filter over dimension values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equals { dimension: Dimension, value: String },
    InList { dimension: Dimension, values: Vec<String> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn equals(dimension: Dimension, value: impl Into<String>) -> Self {
        Self::Equals {
            dimension,
            value: value.into(),
        }
    }

    pub fn in_list<I, S>(dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InList {
            dimension,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjunction of two optional filters.
    pub fn and_opt(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(Self::And(vec![a, b])),
            (a, b) => a.or(b),
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::InvalidRequest(format!(
                "date range starts {start} after it ends {end}"
            )));
        }
        Ok(Self { start, end })
    }
}

/// A dimension/metric selection over a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub date_range: DateRange,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<Metric>,
    pub filter: Option<Filter>,
    pub order_bys: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ReportRequest {
    pub const fn new(date_range: DateRange) -> Self {
        Self {
            date_range,
            dimensions: Vec::new(),
            metrics: Vec::new(),
            filter: None,
            order_bys: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    #[must_use]
    pub fn dimensions(mut self, dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        self.dimensions.extend(dimensions);
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: impl IntoIterator<Item = Metric>) -> Self {
        self.metrics.extend(metrics);
        self
    }

    /// Combine `filter` with any filter already set.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Filter::and_opt(self.filter.take(), Some(filter));
        self
    }

    #[must_use]
    pub fn filter_opt(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(f) => self.filter(f),
            None => self,
        }
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_bys.push(order);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Check the request is answerable: at least one metric, no repeated
    /// dimension or metric, and sort keys that refer to selected fields.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.metrics.is_empty() {
            return Err(SourceError::InvalidRequest(
                "at least one metric is required".to_string(),
            ));
        }
        if let Some(d) = first_repeat(&self.dimensions) {
            return Err(SourceError::InvalidRequest(format!(
                "dimension {} requested twice",
                d.name()
            )));
        }
        if let Some(m) = first_repeat(&self.metrics) {
            return Err(SourceError::InvalidRequest(format!(
                "metric {} requested twice",
                m.name()
            )));
        }
        for order in &self.order_bys {
            let selected = match order.key {
                OrderKey::Metric(m) => self.metrics.contains(&m),
                OrderKey::Dimension(d) => self.dimensions.contains(&d),
            };
            if !selected {
                return Err(SourceError::InvalidRequest(format!(
                    "cannot order by unselected field {order:?}"
                )));
            }
        }
        Ok(())
    }
}

fn first_repeat<T: PartialEq + Copy>(items: &[T]) -> Option<T> {
    items
        .iter()
        .enumerate()
        .find(|(i, item)| items[..*i].contains(item))
        .map(|(_, item)| *item)
}

/// One result row, values aligned with the request's dimensions and metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRow {
    pub dimension_values: Vec<String>,
    pub metric_values: Vec<f64>,
}

/// Anything that can answer a [`ReportRequest`]. Rows come back in no
/// particular order unless the request asks for one.
pub trait AnalyticsSource {
    fn run_report(&self, request: &ReportRequest) -> Result<Vec<RawRow>, SourceError>;
}

#[derive(Debug)]
pub enum SourceError {
    Query(duckdb::Error),
    InvalidRequest(String),
    MalformedRow { index: usize, reason: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {msg}"),
            Self::MalformedRow { index, reason } => write!(f, "Malformed row {index}: {reason}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<duckdb::Error> for SourceError {
    fn from(e: duckdb::Error) -> Self {
        Self::Query(e)
    }
}
