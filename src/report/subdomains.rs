use crate::report::{BuiltReport, ReportContext, ReportError, ReportKind};
use crate::sink::{Cell, SheetDocument};
use crate::source::{Dimension, Metric, OrderBy, RawRow, SourceError};

const HEADER: [&str; 4] = ["Hostname", "Pageviews", "Engaged Sessions", "Users"];

/// Pageviews, engaged sessions and users per hostname, busiest first.
///
/// With `base_hostname` set, only that host and its subdomains are listed.
pub(super) fn build(ctx: &ReportContext<'_>, title: String) -> Result<BuiltReport, ReportError> {
    let window = ctx.window(ctx.config.start_date)?;
    let request = ctx
        .request(window.range)?
        .dimensions([Dimension::Hostname])
        .metrics([
            Metric::ScreenPageViews,
            Metric::EngagedSessions,
            Metric::TotalUsers,
        ])
        .order_by(OrderBy::metric_desc(Metric::ScreenPageViews));
    let raw = ctx.fetch(&request)?;

    let base = ctx.config.base_hostname.as_deref();
    let rows = raw
        .iter()
        .enumerate()
        .filter(|(_, row)| base.is_none_or(|b| is_within(host(row), b)))
        .map(|(index, row)| to_cells(index, row))
        .collect::<Result<Vec<_>, SourceError>>()?;

    let selected = rows.len();
    let header = HEADER.iter().map(|h| (*h).to_string()).collect();
    let mut built = BuiltReport::new(SheetDocument::from_rows(title, header, rows));
    built.warn_if_empty(ReportKind::Subdomains, selected);
    Ok(built)
}

fn host(row: &RawRow) -> &str {
    row.dimension_values.first().map_or("", String::as_str)
}

fn is_within(host: &str, base: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    host == base || host.ends_with(&format!(".{base}"))
}

fn to_cells(index: usize, row: &RawRow) -> Result<Vec<Cell>, SourceError> {
    if row.dimension_values.len() != 1 || row.metric_values.len() != HEADER.len() - 1 {
        return Err(SourceError::MalformedRow {
            index,
            reason: "unexpected hostname row shape".to_string(),
        });
    }
    Ok(std::iter::once(Cell::Text(host(row).to_string()))
        .chain(row.metric_values.iter().map(|v| Cell::number(*v)))
        .collect())
}
