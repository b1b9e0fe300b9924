use crate::source::{RawRow, SourceError};
use crate::trend::row::MetricRow;

fn dimension<'a>(row: &'a RawRow, index: usize, at: usize) -> Result<&'a str, SourceError> {
    row.dimension_values
        .get(at)
        .map(String::as_str)
        .ok_or_else(|| SourceError::MalformedRow {
            index,
            reason: format!("missing dimension {at}"),
        })
}

fn metric(row: &RawRow, index: usize, at: usize) -> Result<f64, SourceError> {
    row.metric_values
        .get(at)
        .copied()
        .ok_or_else(|| SourceError::MalformedRow {
            index,
            reason: format!("missing metric {at}"),
        })
}

fn year_month(row: &RawRow, index: usize) -> Result<(i32, u32), SourceError> {
    let year = dimension(row, index, 0)?;
    let month = dimension(row, index, 1)?;
    let year = year.trim().parse().map_err(|_| SourceError::MalformedRow {
        index,
        reason: format!("year {year:?} is not a number"),
    })?;
    let month = month.trim().parse().map_err(|_| SourceError::MalformedRow {
        index,
        reason: format!("month {month:?} is not a number"),
    })?;
    Ok((year, month))
}

fn build(
    index: usize,
    year: i32,
    month: u32,
    category: &str,
    value: f64,
) -> Result<MetricRow, SourceError> {
    MetricRow::new(year, month, category, value).map_err(|e| SourceError::MalformedRow {
        index,
        reason: e.to_string(),
    })
}

/// Rows shaped `[year, month, category, ..] / [.., value, ..]`: one
/// [`MetricRow`] per raw row, reading the category from dimension 2 and the
/// value from metric `metric_at`.
pub fn metric_rows(rows: &[RawRow], metric_at: usize) -> Result<Vec<MetricRow>, SourceError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let (year, month) = year_month(row, index)?;
            let category = dimension(row, index, 2)?;
            build(index, year, month, category, metric(row, index, metric_at)?)
        })
        .collect()
}

/// Rows shaped `[year, month] / [m0, m1, ..]`: each metric becomes its own
/// category named by `labels`, so several metrics share one table.
pub fn melt_metric_rows(rows: &[RawRow], labels: &[&str]) -> Result<Vec<MetricRow>, SourceError> {
    let mut out = Vec::with_capacity(rows.len() * labels.len());
    for (index, row) in rows.iter().enumerate() {
        let (year, month) = year_month(row, index)?;
        for (at, label) in labels.iter().enumerate() {
            out.push(build(index, year, month, label, metric(row, index, at)?)?);
        }
    }
    Ok(out)
}

/// `(category, score)` pairs for ranking, taken from dimension `dimension_at`
/// and metric `metric_at`.
pub fn scored_categories(
    rows: &[RawRow],
    dimension_at: usize,
    metric_at: usize,
) -> Result<Vec<(String, f64)>, SourceError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let value = metric(row, index, metric_at)?;
            if !value.is_finite() {
                return Err(SourceError::MalformedRow {
                    index,
                    reason: format!("score {value} is not a finite number"),
                });
            }
            Ok((dimension(row, index, dimension_at)?.to_string(), value))
        })
        .collect()
}
