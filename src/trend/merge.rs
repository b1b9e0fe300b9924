use crate::trend::bucket::MonthBucket;
use crate::trend::error::TrendError;
use crate::trend::table::SeriesTable;
use std::collections::HashMap;

/// Left-join `secondary` onto `primary` by month bucket.
///
/// Every primary row is kept; its secondary cells are zero when the month is
/// missing from `secondary`. Months only present in `secondary` are dropped.
/// Columns come out as primary's followed by secondary's, each in their own
/// order, and rows are re-sorted most recent first.
pub fn merge(primary: &SeriesTable, secondary: &SeriesTable) -> Result<SeriesTable, TrendError> {
    let secondary_rows: HashMap<MonthBucket, &[f64]> = secondary
        .rows()
        .iter()
        .map(|r| (r.bucket, r.values.as_slice()))
        .collect();

    let unmatched = secondary
        .rows()
        .iter()
        .filter(|r| primary.row(r.bucket).is_none())
        .count();
    if unmatched > 0 {
        tracing::debug!(unmatched, "Dropped secondary months absent from primary table");
    }

    let width = secondary.schema().len();
    let mut merged = primary.clone();
    merged.append_columns(secondary.schema().columns())?;
    for row in merged.rows_mut() {
        match secondary_rows.get(&row.bucket) {
            Some(values) => row.values.extend_from_slice(values),
            None => row.values.extend(std::iter::repeat(0.0).take(width)),
        }
    }
    merged.sort_descending();
    Ok(merged)
}

/// Fold several secondary tables onto `primary`, left to right.
pub fn merge_all(primary: &SeriesTable, others: &[SeriesTable]) -> Result<SeriesTable, TrendError> {
    others
        .iter()
        .try_fold(primary.clone(), |acc, next| merge(&acc, next))
}
