use crate::report::{select_tracked, BuiltReport, ReportContext, ReportError, ReportKind};
use crate::sink::SheetDocument;
use crate::source::rows::{metric_rows, scored_categories};
use crate::source::{Dimension, Filter, Metric, OrderBy};
use crate::trend::chart::{build_chart, ChartOptions};
use crate::trend::normalize::Normalizer;
use crate::trend::topk::Direction;
use crate::trend::{aggregate, classify, Schema};

/// Top referral sources by sessions, month by month. Months in which no
/// tracked source sent traffic are left out.
pub(super) fn build(ctx: &ReportContext<'_>, title: String) -> Result<BuiltReport, ReportError> {
    let window = ctx.window(ctx.config.start_date)?;
    let normalizer = Normalizer::identity();
    let referral = || Filter::equals(Dimension::SessionMedium, "referral");

    let ranking = ctx
        .request(window.range)?
        .dimensions([Dimension::SessionSource])
        .metrics([Metric::Sessions])
        .filter(referral())
        .order_by(OrderBy::metric_desc(Metric::Sessions));
    let scored = scored_categories(&ctx.fetch(&ranking)?, 0, 0)?;
    let tracked = select_tracked(scored, &normalizer, ctx.config.top_referrals, Direction::Max);

    let monthly = ctx
        .request(window.range)?
        .dimensions([Dimension::Year, Dimension::Month, Dimension::SessionSource])
        .metrics([Metric::Sessions])
        .filter(referral());
    let rows = metric_rows(&ctx.fetch(&monthly)?, 0)?;

    let selected = tracked.len();
    let mut table = aggregate(
        &rows,
        &normalizer,
        &Schema::for_categories(tracked),
        &window.buckets,
    );
    table.drop_empty_rows();
    let chart = build_chart(
        &table,
        &ChartOptions::new("Top Referral Sources Over Time", "Sessions"),
    );

    let document = SheetDocument::from_table(title, &table)
        .with_trend(classify(&table))
        .with_chart(chart);
    let mut built = BuiltReport::new(document);
    built.warn_if_empty(ReportKind::TopReferrals, selected);
    Ok(built)
}
