mod countries;
mod overview;
mod pages;
mod referrals;
mod subdomains;

use crate::config::Config;
use crate::sink::{ReportSink, SheetDocument, SinkError};
use crate::source::{
    fetch_all, AnalyticsSource, DateRange, Dimension, Filter, RawRow, ReportRequest, SourceError,
};
use crate::trend::bucket::{build_buckets, MonthBucket};
use crate::trend::error::TrendError;
use crate::trend::normalize::{CategoryKey, Normalizer};
use crate::trend::topk::{select_top_k, Direction};
use chrono::NaiveDate;
use std::str::FromStr;

/// The reports this crate can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Overview,
    TopPages,
    BottomPages,
    TopReferrals,
    TopCountries,
    Countries,
    Subdomains,
}

impl ReportKind {
    pub const ALL: [Self; 7] = [
        Self::Overview,
        Self::TopPages,
        Self::BottomPages,
        Self::TopReferrals,
        Self::TopCountries,
        Self::Countries,
        Self::Subdomains,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::TopPages => "top-pages",
            Self::BottomPages => "bottom-pages",
            Self::TopReferrals => "top-referrals",
            Self::TopCountries => "top-countries",
            Self::Countries => "countries",
            Self::Subdomains => "subdomains",
        }
    }

    /// Sheet title used when the config names none.
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::TopPages => "Top_Pages",
            Self::BottomPages => "Bottom_Pages",
            Self::TopReferrals => "Top_Referrals",
            Self::TopCountries => "Top_Countries_Monthly",
            Self::Countries => "Top_Countries",
            Self::Subdomains => "Subdomains_Overview",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown report {s:?}, expected one of: {}", known.join(", "))
            })
    }
}

/// Which hostnames a run reports on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostScope {
    #[default]
    All,
    /// The configured `portal_hostnames`.
    Portal,
    /// `<name>.<base_hostname>`.
    Subdomain(String),
}

impl HostScope {
    /// Hostname filter for this scope, if any.
    pub fn filter(&self, config: &Config) -> Result<Option<Filter>, SourceError> {
        match self {
            Self::All => Ok(None),
            Self::Portal if config.portal_hostnames.is_empty() => Err(SourceError::InvalidRequest(
                "portal scope needs portal_hostnames".to_string(),
            )),
            Self::Portal => Ok(Some(Filter::in_list(
                Dimension::Hostname,
                config.portal_hostnames.iter().cloned(),
            ))),
            Self::Subdomain(name) => {
                let base = config.base_hostname.as_deref().ok_or_else(|| {
                    SourceError::InvalidRequest(format!(
                        "subdomain scope {name:?} needs base_hostname"
                    ))
                })?;
                Ok(Some(Filter::equals(
                    Dimension::Hostname,
                    format!("{name}.{base}"),
                )))
            }
        }
    }

    fn suffix(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Portal => Some("portal"),
            Self::Subdomain(name) => Some(name),
        }
    }
}

impl FromStr for HostScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "" => Err("empty scope".to_string()),
            "all" => Ok(Self::All),
            "portal" => Ok(Self::Portal),
            _ if s.contains(['.', '/', ' ']) => Err(format!("invalid subdomain {s:?}")),
            _ => Ok(Self::Subdomain(s.to_ascii_lowercase())),
        }
    }
}

impl std::fmt::Display for HostScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix().unwrap_or("all"))
    }
}

/// Everything a report needs, passed explicitly.
pub struct ReportContext<'a> {
    pub config: &'a Config,
    pub scope: HostScope,
    /// Last day included in every report.
    pub today: NaiveDate,
    pub source: &'a dyn AnalyticsSource,
}

/// Date range and month scaffold shared by a report's queries.
struct Window {
    range: DateRange,
    buckets: Vec<MonthBucket>,
}

impl ReportContext<'_> {
    fn window(&self, start: NaiveDate) -> Result<Window, ReportError> {
        let buckets = build_buckets(start, self.today)?;
        let range = DateRange::new(start, self.today)?;
        Ok(Window { range, buckets })
    }

    /// A request over `range` restricted to the scope's hostnames.
    fn request(&self, range: DateRange) -> Result<ReportRequest, ReportError> {
        Ok(ReportRequest::new(range).filter_opt(self.scope.filter(self.config)?))
    }

    fn fetch(&self, request: &ReportRequest) -> Result<Vec<RawRow>, ReportError> {
        Ok(fetch_all(self.source, request, self.config.page_size)?)
    }

    fn title(&self, kind: ReportKind) -> String {
        let title = self.config.title(kind.as_str(), kind.default_title());
        match self.scope.suffix() {
            Some(suffix) => format!("{title}_{suffix}"),
            None => title,
        }
    }
}

/// Rank `(category, score)` pairs after normalization and keep `k`.
fn select_tracked(
    scored: Vec<(String, f64)>,
    normalizer: &Normalizer,
    k: usize,
    direction: Direction,
) -> Vec<CategoryKey> {
    select_top_k(
        scored
            .into_iter()
            .map(|(category, score)| (normalizer.normalize(&category), score)),
        k,
        direction,
    )
}

/// Non-fatal conditions worth surfacing next to a finished report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportWarning {
    /// No categories were selected; the table has no category columns.
    EmptySelection { report: ReportKind },
}

impl std::fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySelection { report } => {
                write!(f, "{report}: selection is empty, no categories to track")
            }
        }
    }
}

/// A document ready to publish.
#[derive(Debug, Clone)]
pub struct BuiltReport {
    pub document: SheetDocument,
    pub warnings: Vec<ReportWarning>,
}

impl BuiltReport {
    const fn new(document: SheetDocument) -> Self {
        Self {
            document,
            warnings: Vec::new(),
        }
    }

    fn warn_if_empty(&mut self, kind: ReportKind, selected: usize) {
        if selected == 0 {
            tracing::warn!(report = %kind, "Empty selection");
            self.warnings.push(ReportWarning::EmptySelection { report: kind });
        }
    }
}

/// Summary of a published report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub kind: ReportKind,
    pub title: String,
    pub rows: usize,
    pub columns: usize,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug)]
pub enum ReportError {
    Source(SourceError),
    Trend(TrendError),
    Sink(SinkError),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(e) => write!(f, "Source error: {e}"),
            Self::Trend(e) => write!(f, "Trend error: {e}"),
            Self::Sink(e) => write!(f, "Sink error: {e}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            Self::Trend(e) => Some(e),
            Self::Sink(e) => Some(e),
        }
    }
}

impl From<SourceError> for ReportError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<TrendError> for ReportError {
    fn from(e: TrendError) -> Self {
        Self::Trend(e)
    }
}

impl From<SinkError> for ReportError {
    fn from(e: SinkError) -> Self {
        Self::Sink(e)
    }
}

/// Build the document for `kind` without publishing it.
pub fn build(kind: ReportKind, ctx: &ReportContext<'_>) -> Result<BuiltReport, ReportError> {
    let title = ctx.title(kind);
    match kind {
        ReportKind::Overview => overview::build(ctx, title),
        ReportKind::TopPages => pages::build_top(ctx, title),
        ReportKind::BottomPages => pages::build_bottom(ctx, title),
        ReportKind::TopReferrals => referrals::build(ctx, title),
        ReportKind::TopCountries => countries::build_monthly(ctx, title),
        ReportKind::Countries => countries::build_flat(ctx, title),
        ReportKind::Subdomains => subdomains::build(ctx, title),
    }
}

/// Build `kind` and publish it to `sink`.
///
/// The document is complete before the sink sees it; a failure anywhere
/// leaves the sink untouched by this report.
pub fn run(
    kind: ReportKind,
    ctx: &ReportContext<'_>,
    sink: &mut dyn ReportSink,
) -> Result<ReportOutcome, ReportError> {
    let built = build(kind, ctx)?;
    sink.publish(&built.document)?;
    let outcome = ReportOutcome {
        kind,
        title: built.document.title.clone(),
        rows: built.document.rows.len(),
        columns: built.document.header.len(),
        warnings: built.warnings,
    };
    tracing::info!(
        report = %kind,
        title = %outcome.title,
        rows = outcome.rows,
        columns = outcome.columns,
        "Report published"
    );
    Ok(outcome)
}
