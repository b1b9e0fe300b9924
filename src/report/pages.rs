use crate::report::{select_tracked, BuiltReport, ReportContext, ReportError, ReportKind};
use crate::sink::SheetDocument;
use crate::source::rows::{metric_rows, scored_categories};
use crate::source::{Dimension, Metric, OrderBy};
use crate::trend::chart::{build_chart, ChartOptions};
use crate::trend::normalize::CategoryKey;
use crate::trend::topk::Direction;
use crate::trend::{aggregate, classify, Schema};
use std::collections::HashMap;

const TOTAL_PAGEVIEWS: &str = "Total Pageviews";
/// Lines drawn on the top-pages chart, the total included.
const CHART_SERIES: usize = 10;

/// Most viewed normalized paths, month by month, with a total column.
pub(super) fn build_top(ctx: &ReportContext<'_>, title: String) -> Result<BuiltReport, ReportError> {
    let window = ctx.window(ctx.config.start_date)?;
    let normalizer = ctx.config.path_normalizer();

    let ranking = ctx
        .request(window.range)?
        .dimensions([Dimension::PagePath])
        .metrics([Metric::ScreenPageViews])
        .order_by(OrderBy::metric_desc(Metric::ScreenPageViews));
    let scored = scored_categories(&ctx.fetch(&ranking)?, 0, 0)?;
    let tracked = select_tracked(scored, &normalizer, ctx.config.top_pages, Direction::Max);

    let monthly = ctx
        .request(window.range)?
        .dimensions([Dimension::Year, Dimension::Month, Dimension::PagePath])
        .metrics([Metric::ScreenPageViews]);
    let rows = metric_rows(&ctx.fetch(&monthly)?, 0)?;

    let selected = tracked.len();
    let schema = Schema::for_categories(tracked).with_total(TOTAL_PAGEVIEWS);
    let table = aggregate(&rows, &normalizer, &schema, &window.buckets);
    let chart = build_chart(
        &table,
        &ChartOptions::new("Top Pages Views Over Time", "Page Views").max_series(CHART_SERIES),
    );

    let document = SheetDocument::from_table(title, &table)
        .with_trend(classify(&table))
        .with_chart(chart);
    let mut built = BuiltReport::new(document);
    built.warn_if_empty(ReportKind::TopPages, selected);
    Ok(built)
}

/// Least viewed normalized paths, month by month, headed `title\n(path)`.
pub(super) fn build_bottom(
    ctx: &ReportContext<'_>,
    title: String,
) -> Result<BuiltReport, ReportError> {
    let window = ctx.window(ctx.config.start_date)?;
    let normalizer = ctx.config.path_normalizer();

    let ranking = ctx
        .request(window.range)?
        .dimensions([Dimension::PagePath, Dimension::PageTitle])
        .metrics([Metric::ScreenPageViews])
        .order_by(OrderBy::metric_asc(Metric::ScreenPageViews));
    let ranking_rows = ctx.fetch(&ranking)?;

    // first title seen for each normalized path
    let mut titles: HashMap<CategoryKey, String> = HashMap::new();
    for row in &ranking_rows {
        if let [path, page_title, ..] = row.dimension_values.as_slice() {
            titles
                .entry(normalizer.normalize(path))
                .or_insert_with(|| page_title.clone());
        }
    }
    let scored = scored_categories(&ranking_rows, 0, 0)?;
    let tracked = select_tracked(scored, &normalizer, ctx.config.bottom_pages, Direction::Min);

    let monthly = ctx
        .request(window.range)?
        .dimensions([Dimension::Year, Dimension::Month, Dimension::PagePath])
        .metrics([Metric::ScreenPageViews]);
    let rows = metric_rows(&ctx.fetch(&monthly)?, 0)?;

    let selected = tracked.len();
    let mut schema = Schema::for_categories(tracked.iter().cloned());
    for key in &tracked {
        let page_title = titles.get(key).map_or(key.as_str(), String::as_str);
        schema.relabel(key, format!("{page_title}\n({key})"));
    }
    let table = aggregate(&rows, &normalizer, &schema, &window.buckets);

    let document = SheetDocument::from_table(title, &table).with_trend(classify(&table));
    let mut built = BuiltReport::new(document);
    built.warn_if_empty(ReportKind::BottomPages, selected);
    Ok(built)
}
