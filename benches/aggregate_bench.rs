use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mallard_trends::trend::{
    aggregate, build_buckets, classify, select_top_k, Direction, MetricRow, Normalizer, Schema,
};

fn make_rows(size: usize) -> Vec<MetricRow> {
    (0..size)
        .map(|i| {
            let month = u32::try_from(i % 12).unwrap_or(0) + 1;
            let year = 2020 + i32::try_from((i / 12) % 4).unwrap_or(0);
            let path = if i % 7 == 0 {
                format!("/glycan-search/{i}")
            } else {
                format!("/page-{}/", i % 50)
            };
            MetricRow::new(year, month, path, f64::from(u32::try_from(i % 97).unwrap_or(0)))
                .unwrap()
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let normalizer = Normalizer::page_paths();
    let buckets = build_buckets(
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    )
    .unwrap();

    for size in [1_000, 10_000, 100_000] {
        // Row generation and top-K stay outside the timed loop
        let rows = make_rows(size);
        let tracked = select_top_k(
            rows.iter()
                .map(|r| (normalizer.normalize(&r.category), r.value)),
            20,
            Direction::Max,
        );
        let schema = Schema::for_categories(tracked).with_total("Total Pageviews");

        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| aggregate(rows, &normalizer, &schema, &buckets));
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let normalizer = Normalizer::page_paths();
    let buckets = build_buckets(
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    )
    .unwrap();
    let rows = make_rows(10_000);
    let tracked = select_top_k(
        rows.iter()
            .map(|r| (normalizer.normalize(&r.category), r.value)),
        20,
        Direction::Max,
    );
    let schema = Schema::for_categories(tracked).with_total("Total Pageviews");
    let table = aggregate(&rows, &normalizer, &schema, &buckets);

    c.bench_function("classify_48x21", |b| {
        b.iter(|| classify(&table));
    });
}

criterion_group!(benches, bench_aggregate, bench_classify);
criterion_main!(benches);
