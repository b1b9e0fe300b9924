use crate::report::{BuiltReport, ReportContext, ReportError};
use crate::sink::SheetDocument;
use crate::source::rows::{melt_metric_rows, metric_rows};
use crate::source::{Dimension, Metric};
use crate::trend::chart::{build_chart, ChartOptions};
use crate::trend::normalize::{Normalizer, DIRECT, ORGANIC_SEARCH, REFERRAL};
use crate::trend::{aggregate, classify, merge, Schema};

const TOTAL_USERS: &str = "Total Users";
const ACTIVE_USERS: &str = "Users/Active Users";
const RETURNING_USERS: &str = "Returning Users";
const NEW_USERS: &str = "New Users";
const EVENTS: &str = "Hits/Events";
const SESSIONS: &str = "Sessions";

/// Fetched metrics and the column each one fills.
const CORE: [(Metric, &str); 5] = [
    (Metric::TotalUsers, TOTAL_USERS),
    (Metric::ActiveUsers, ACTIVE_USERS),
    (Metric::NewUsers, NEW_USERS),
    (Metric::EventCount, EVENTS),
    (Metric::Sessions, SESSIONS),
];

const USER_COLUMNS: [&str; 4] = [TOTAL_USERS, ACTIVE_USERS, RETURNING_USERS, NEW_USERS];
const CHANNELS: [&str; 3] = [ORGANIC_SEARCH, DIRECT, REFERRAL];

/// Monthly core usage metrics joined with sessions per traffic channel.
pub(super) fn build(ctx: &ReportContext<'_>, title: String) -> Result<BuiltReport, ReportError> {
    let window = ctx.window(ctx.config.overview_start_date)?;

    let core_request = ctx
        .request(window.range)?
        .dimensions([Dimension::Year, Dimension::Month])
        .metrics(CORE.map(|(m, _)| m));
    let labels = CORE.map(|(_, label)| label);
    let core_rows = melt_metric_rows(&ctx.fetch(&core_request)?, &labels)?;
    let mut core = aggregate(
        &core_rows,
        &Normalizer::identity(),
        &Schema::for_categories(labels),
        &window.buckets,
    );
    core.derive_column(RETURNING_USERS, 2, |row| {
        row.get(TOTAL_USERS) - row.get(NEW_USERS)
    })?;

    let traffic_request = ctx
        .request(window.range)?
        .dimensions([Dimension::Year, Dimension::Month, Dimension::SessionSource])
        .metrics([Metric::Sessions]);
    let traffic_rows = metric_rows(&ctx.fetch(&traffic_request)?, 0)?;
    let traffic = aggregate(
        &traffic_rows,
        &Normalizer::traffic_channels(),
        &Schema::for_categories(CHANNELS),
        &window.buckets,
    );

    let table = merge(&core, &traffic)?;
    let users_chart = build_chart(
        &table,
        &ChartOptions::new("User Metrics Over Time", "Count")
            .columns(USER_COLUMNS)
            .axis_columns(USER_COLUMNS),
    );
    let traffic_chart = build_chart(
        &table,
        &ChartOptions::new("Traffic Sources Distribution Over Time", "Sessions").columns(CHANNELS),
    );

    let document = SheetDocument::from_table(title, &table)
        .with_trend(classify(&table))
        .with_chart(users_chart)
        .with_chart(traffic_chart);
    Ok(BuiltReport::new(document))
}
