use crate::trend::bucket::MonthBucket;
use crate::trend::normalize::{CategoryKey, Normalizer};
use crate::trend::row::MetricRow;
use crate::trend::table::{ColumnKind, Schema, SeriesRow, SeriesTable};
use std::collections::HashMap;

/// Fold metric rows into a dense `[bucket × column]` table.
///
/// Every `(bucket, tracked category)` cell starts at zero. Each row's category
/// is normalized; rows outside the tracked set or outside `buckets` are
/// dropped. Duplicate contributions are summed. A Total column in `schema`
/// receives the row sum of the category columns. Rows come back most recent
/// first.
pub fn aggregate(
    rows: &[MetricRow],
    normalizer: &Normalizer,
    schema: &Schema,
    buckets: &[MonthBucket],
) -> SeriesTable {
    let width = schema.len();
    let mut table_rows: Vec<SeriesRow> = Vec::with_capacity(buckets.len());
    let mut row_index: HashMap<MonthBucket, usize> = HashMap::with_capacity(buckets.len());
    for &bucket in buckets {
        row_index.entry(bucket).or_insert_with(|| {
            table_rows.push(SeriesRow {
                bucket,
                values: vec![0.0; width],
            });
            table_rows.len() - 1
        });
    }

    let column_index: HashMap<&CategoryKey, usize> = schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ColumnKind::Category)
        .map(|(i, c)| (&c.key, i))
        .collect();

    let mut untracked = 0usize;
    let mut out_of_range = 0usize;
    for row in rows {
        let Some(bucket) = MonthBucket::new(row.year, row.month) else {
            out_of_range += 1;
            continue;
        };
        let Some(&r) = row_index.get(&bucket) else {
            out_of_range += 1;
            continue;
        };
        let key = normalizer.normalize(&row.category);
        let Some(&c) = column_index.get(&key) else {
            untracked += 1;
            continue;
        };
        table_rows[r].values[c] += row.value;
    }

    if untracked > 0 || out_of_range > 0 {
        tracing::debug!(untracked, out_of_range, "Dropped rows during aggregation");
    }

    let total_positions: Vec<usize> = schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ColumnKind::Total)
        .map(|(i, _)| i)
        .collect();
    if !total_positions.is_empty() {
        // schema order, so the float sum is the same on every run
        let category_positions: Vec<usize> = schema
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Category)
            .map(|(i, _)| i)
            .collect();
        for row in &mut table_rows {
            let total: f64 = category_positions.iter().map(|&c| row.values[c]).sum();
            for &t in &total_positions {
                row.values[t] = total;
            }
        }
    }

    SeriesTable::from_dense_rows(schema.clone(), table_rows)
}
