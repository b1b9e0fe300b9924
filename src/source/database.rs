use crate::source::{
    AnalyticsSource, Dimension, Filter, Metric, OrderKey, RawRow, ReportRequest, SourceError,
};
use crate::storage::schema::QUERY_VIEW;
use duckdb::Connection;
use std::fmt::Write;

/// Answers report requests from the DuckDB events table of one site.
///
/// Sessions are visitor-days; engaged sessions are visitor-days with more
/// than one event; a new user is a visitor whose first event ever recorded for
/// the site falls inside the group.
pub struct DuckDbSource {
    conn: Connection,
    site_id: String,
}

impl DuckDbSource {
    /// Query the `events_all` view for `site_id`.
    pub fn new(conn: Connection, site_id: impl Into<String>) -> Self {
        Self {
            conn,
            site_id: site_id.into(),
        }
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }
}

const fn dimension_expr(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Year => "CAST(year(timestamp) AS VARCHAR)",
        Dimension::Month => "CAST(month(timestamp) AS VARCHAR)",
        Dimension::PagePath => "pathname",
        Dimension::PageTitle => "COALESCE(page_title, pathname)",
        Dimension::SessionSource => "COALESCE(referrer_source, utm_source, '(direct)')",
        Dimension::SessionMedium => {
            "CASE WHEN utm_medium IS NOT NULL THEN utm_medium \
             WHEN referrer_source IS NOT NULL OR referrer IS NOT NULL THEN 'referral' \
             ELSE '(none)' END"
        }
        Dimension::Country => "COALESCE(country_code, '(not set)')",
        Dimension::Hostname => "COALESCE(hostname, site_id)",
    }
}

const fn metric_expr(metric: Metric) -> &'static str {
    match metric {
        Metric::ScreenPageViews => "COUNT(*) FILTER (WHERE event_name = 'pageview')",
        Metric::TotalUsers | Metric::ActiveUsers => "COUNT(DISTINCT visitor_id)",
        Metric::NewUsers => "COUNT(DISTINCT visitor_id) FILTER (WHERE timestamp = first_seen)",
        Metric::EventCount => "COUNT(*)",
        Metric::Sessions => "COUNT(DISTINCT visitor_id || '/' || CAST(CAST(timestamp AS DATE) AS VARCHAR))",
        Metric::EngagedSessions => {
            "COUNT(DISTINCT visitor_id || '/' || CAST(CAST(timestamp AS DATE) AS VARCHAR)) \
             FILTER (WHERE day_events > 1)"
        }
    }
}

/// Append the SQL for `filter` to `sql`, pushing its parameters.
fn compile_filter(filter: &Filter, sql: &mut String, params: &mut Vec<String>) {
    match filter {
        Filter::Equals { dimension, value } => {
            let _ = write!(sql, "({} = ?)", dimension_expr(*dimension));
            params.push(value.clone());
        }
        Filter::InList { values, .. } if values.is_empty() => sql.push_str("FALSE"),
        Filter::InList { dimension, values } => {
            let marks = vec!["?"; values.len()].join(", ");
            let _ = write!(sql, "({} IN ({marks}))", dimension_expr(*dimension));
            params.extend(values.iter().cloned());
        }
        Filter::And(parts) => compile_group(parts, " AND ", "TRUE", sql, params),
        Filter::Or(parts) => compile_group(parts, " OR ", "FALSE", sql, params),
    }
}

fn compile_group(
    parts: &[Filter],
    joiner: &str,
    empty: &str,
    sql: &mut String,
    params: &mut Vec<String>,
) {
    if parts.is_empty() {
        sql.push_str(empty);
        return;
    }
    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(joiner);
        }
        compile_filter(part, sql, params);
    }
    sql.push(')');
}

/// Compile a validated request into SQL and its positional parameters.
fn compile(site_id: &str, request: &ReportRequest) -> (String, Vec<String>) {
    let mut params = vec![site_id.to_string()];

    let mut select: Vec<String> = request
        .dimensions
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{} AS d{i}", dimension_expr(*d)))
        .collect();
    select.extend(
        request
            .metrics
            .iter()
            .enumerate()
            .map(|(i, m)| format!("CAST({} AS DOUBLE) AS m{i}", metric_expr(*m))),
    );

    let mut sql = format!(
        "WITH scoped AS (
            SELECT *,
                   MIN(timestamp) OVER (PARTITION BY visitor_id) AS first_seen,
                   COUNT(*) OVER (PARTITION BY visitor_id, CAST(timestamp AS DATE)) AS day_events
            FROM {QUERY_VIEW}
            WHERE site_id = ?
         )
         SELECT {}
         FROM scoped
         WHERE timestamp >= CAST(? AS TIMESTAMP) AND timestamp < CAST(? AS TIMESTAMP)",
        select.join(", ")
    );
    params.push(request.date_range.start.to_string());
    // end date is inclusive
    let end = request
        .date_range
        .end
        .succ_opt()
        .unwrap_or(request.date_range.end);
    params.push(end.to_string());

    if let Some(filter) = &request.filter {
        sql.push_str(" AND ");
        compile_filter(filter, &mut sql, &mut params);
    }

    if !request.dimensions.is_empty() {
        let positions: Vec<String> = (1..=request.dimensions.len())
            .map(|i: usize| i.to_string())
            .collect();
        let _ = write!(sql, " GROUP BY {}", positions.join(", "));
    }

    let mut order: Vec<String> = request
        .order_bys
        .iter()
        .filter_map(|o| {
            let column = match o.key {
                OrderKey::Metric(m) => format!("m{}", request.metrics.iter().position(|x| *x == m)?),
                OrderKey::Dimension(d) => {
                    format!("d{}", request.dimensions.iter().position(|x| *x == d)?)
                }
            };
            Some(format!("{column} {}", if o.descending { "DESC" } else { "ASC" }))
        })
        .collect();
    // remaining ties broken on the dimensions so pages never overlap
    order.extend((0..request.dimensions.len()).map(|i| format!("d{i} ASC")));
    if !order.is_empty() {
        let _ = write!(sql, " ORDER BY {}", order.join(", "));
    }

    if let Some(limit) = request.limit {
        let _ = write!(sql, " LIMIT {limit}");
    }
    if request.offset > 0 {
        let _ = write!(sql, " OFFSET {}", request.offset);
    }

    (sql, params)
}

impl AnalyticsSource for DuckDbSource {
    fn run_report(&self, request: &ReportRequest) -> Result<Vec<RawRow>, SourceError> {
        request.validate()?;
        let (sql, params) = compile(&self.site_id, request);
        let dims = request.dimensions.len();
        let metrics = request.metrics.len();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(duckdb::params_from_iter(params.iter()), |row| {
                let mut dimension_values = Vec::with_capacity(dims);
                for i in 0..dims {
                    dimension_values.push(row.get::<_, String>(i)?);
                }
                let mut metric_values = Vec::with_capacity(metrics);
                for i in 0..metrics {
                    metric_values.push(row.get::<_, f64>(dims + i)?);
                }
                Ok(RawRow {
                    dimension_values,
                    metric_values,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            site_id = %self.site_id,
            rows = rows.len(),
            dimensions = dims,
            metrics,
            "Report query finished"
        );
        Ok(rows)
    }
}
