use crate::report::{select_tracked, BuiltReport, ReportContext, ReportError, ReportKind};
use crate::sink::{Cell, SheetDocument};
use crate::source::rows::{metric_rows, scored_categories};
use crate::source::{Dimension, Metric, OrderBy};
use crate::trend::chart::{build_chart, ChartOptions};
use crate::trend::normalize::Normalizer;
use crate::trend::topk::Direction;
use crate::trend::{aggregate, classify, Schema};

const TOTAL_ENGAGED: &str = "Total Engaged Sessions";

/// Top countries by engaged sessions, month by month, with a total column.
pub(super) fn build_monthly(
    ctx: &ReportContext<'_>,
    title: String,
) -> Result<BuiltReport, ReportError> {
    let window = ctx.window(ctx.config.start_date)?;
    let normalizer = Normalizer::identity();

    let ranking = ctx
        .request(window.range)?
        .dimensions([Dimension::Country])
        .metrics([Metric::EngagedSessions])
        .order_by(OrderBy::metric_desc(Metric::EngagedSessions));
    let scored = scored_categories(&ctx.fetch(&ranking)?, 0, 0)?;
    let tracked = select_tracked(scored, &normalizer, ctx.config.top_countries, Direction::Max);

    let monthly = ctx
        .request(window.range)?
        .dimensions([Dimension::Year, Dimension::Month, Dimension::Country])
        .metrics([Metric::EngagedSessions]);
    let rows = metric_rows(&ctx.fetch(&monthly)?, 0)?;

    let selected = tracked.len();
    let countries: Vec<String> = tracked.iter().map(ToString::to_string).collect();
    let schema = Schema::for_categories(tracked).with_total(TOTAL_ENGAGED);
    let table = aggregate(&rows, &normalizer, &schema, &window.buckets);
    let chart = build_chart(
        &table,
        &ChartOptions::new("Top Countries Engagement Over Time", "Engaged Sessions")
            .columns(countries),
    );

    let document = SheetDocument::from_table(title, &table)
        .with_trend(classify(&table))
        .with_chart(chart);
    let mut built = BuiltReport::new(document);
    built.warn_if_empty(ReportKind::TopCountries, selected);
    Ok(built)
}

/// Top countries by pageviews over the whole window, as a flat table.
pub(super) fn build_flat(ctx: &ReportContext<'_>, title: String) -> Result<BuiltReport, ReportError> {
    let window = ctx.window(ctx.config.start_date)?;
    let request = ctx
        .request(window.range)?
        .dimensions([Dimension::Country])
        .metrics([Metric::ScreenPageViews])
        .order_by(OrderBy::metric_desc(Metric::ScreenPageViews))
        .limit(ctx.config.top_countries);
    let scored = scored_categories(&ctx.fetch(&request)?, 0, 0)?;

    let selected = scored.len();
    let rows = scored
        .into_iter()
        .map(|(country, pageviews)| vec![Cell::Text(country), Cell::number(pageviews)])
        .collect();
    let header = vec!["Country".to_string(), "Pageviews".to_string()];
    let mut built = BuiltReport::new(SheetDocument::from_rows(title, header, rows));
    built.warn_if_empty(ReportKind::Countries, selected);
    Ok(built)
}
