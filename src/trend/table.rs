use crate::trend::bucket::MonthBucket;
use crate::trend::error::TrendError;
use crate::trend::normalize::CategoryKey;
use serde::Serialize;
use std::collections::HashSet;

/// Header of the leading bucket column.
pub const BUCKET_COLUMN: &str = "Month-Year";

/// Where a numeric column's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// A tracked category filled by aggregation.
    Category,
    /// Row sum of the category columns.
    Total,
    /// Computed from other columns after aggregation.
    Derived,
}

/// A numeric column: the category it tracks and the header shown for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub key: CategoryKey,
    pub label: String,
    pub kind: ColumnKind,
}

/// Ordered numeric columns of a table, decided once per report.
///
/// The bucket column is implicit and always first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// One category column per distinct key, in the given order. Labels
    /// default to the key itself.
    pub fn for_categories<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<CategoryKey>,
    {
        let mut seen = HashSet::new();
        let columns = keys
            .into_iter()
            .map(Into::into)
            .filter(|key: &CategoryKey| seen.insert(key.clone()))
            .map(|key| Column {
                label: key.as_str().to_string(),
                key,
                kind: ColumnKind::Category,
            })
            .collect();
        Self { columns }
    }

    /// Add a Total column directly after the bucket column.
    #[must_use]
    pub fn with_total(mut self, label: &str) -> Self {
        self.columns.retain(|c| c.kind != ColumnKind::Total);
        self.columns.insert(
            0,
            Column {
                key: CategoryKey::new(label),
                label: label.to_string(),
                kind: ColumnKind::Total,
            },
        );
        self
    }

    /// Change the header shown for the category column tracking `key`.
    pub fn relabel(&mut self, key: &CategoryKey, label: impl Into<String>) {
        if let Some(column) = self
            .columns
            .iter_mut()
            .find(|c| c.kind == ColumnKind::Category && &c.key == key)
        {
            column.label = label.into();
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of the numeric column with header `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label == label)
    }

    /// Tracked category keys in column order.
    pub fn tracked(&self) -> impl Iterator<Item = &CategoryKey> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Category)
            .map(|c| &c.key)
    }

    pub fn has_categories(&self) -> bool {
        self.tracked().next().is_some()
    }

    /// Numeric column headers in order.
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// Full header row, bucket column first.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(BUCKET_COLUMN.to_string())
            .chain(self.columns.iter().map(|c| c.label.clone()))
            .collect()
    }

    fn push(&mut self, column: Column) {
        self.columns.push(column);
    }
}

/// One month of a table; `values` align with the schema's columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRow {
    pub bucket: MonthBucket,
    pub values: Vec<f64>,
}

impl SeriesRow {
    pub fn is_all_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

/// Read access to one row by column header.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    schema: &'a Schema,
    row: &'a SeriesRow,
}

impl RowRef<'_> {
    pub const fn bucket(&self) -> MonthBucket {
        self.row.bucket
    }

    /// Value under `label`, or 0 when the column does not exist.
    pub fn get(&self, label: &str) -> f64 {
        self.schema
            .position(label)
            .and_then(|i| self.row.values.get(i).copied())
            .unwrap_or(0.0)
    }
}

/// Dense month × column matrix, most recent month first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    schema: Schema,
    rows: Vec<SeriesRow>,
}

impl SeriesTable {
    /// Assemble a table and apply the descending bucket order.
    ///
    /// Every row must carry exactly one value per schema column.
    pub fn from_parts(schema: Schema, rows: Vec<SeriesRow>) -> Result<Self, TrendError> {
        if let Some(row) = rows.iter().find(|r| r.values.len() != schema.len()) {
            return Err(TrendError::RowWidth {
                bucket: row.bucket.label(),
                expected: schema.len(),
                found: row.values.len(),
            });
        }
        Ok(Self::from_dense_rows(schema, rows))
    }

    /// Rows already sized to `schema`.
    pub(crate) fn from_dense_rows(schema: Schema, rows: Vec<SeriesRow>) -> Self {
        let mut table = Self { schema, rows };
        table.sort_descending();
        table
    }

    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn buckets(&self) -> Vec<MonthBucket> {
        self.rows.iter().map(|r| r.bucket).collect()
    }

    pub fn row(&self, bucket: MonthBucket) -> Option<&SeriesRow> {
        self.rows.iter().find(|r| r.bucket == bucket)
    }

    /// Cell at `(bucket, column header)`.
    pub fn value(&self, bucket: MonthBucket, label: &str) -> Option<f64> {
        let i = self.schema.position(label)?;
        self.row(bucket).and_then(|r| r.values.get(i).copied())
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, label: &str) -> Option<Vec<f64>> {
        let i = self.schema.position(label)?;
        Some(self.rows.iter().map(|r| r.values[i]).collect())
    }

    /// Most recent month first.
    pub fn sort_descending(&mut self) {
        self.rows.sort_by(|a, b| b.bucket.cmp(&a.bucket));
    }

    /// Remove months in which every numeric column is zero.
    pub fn drop_empty_rows(&mut self) {
        self.rows.retain(|r| !r.is_all_zero());
    }

    /// Insert a computed column at position `at` (clamped to the column count).
    pub fn derive_column<F>(&mut self, label: &str, at: usize, f: F) -> Result<(), TrendError>
    where
        F: Fn(RowRef<'_>) -> f64,
    {
        if self.schema.position(label).is_some() {
            return Err(TrendError::DuplicateColumn(label.to_string()));
        }
        let derived: Vec<f64> = self
            .rows
            .iter()
            .map(|row| {
                f(RowRef {
                    schema: &self.schema,
                    row,
                })
            })
            .collect();

        let at = at.min(self.schema.len());
        self.schema.columns.insert(
            at,
            Column {
                key: CategoryKey::new(label),
                label: label.to_string(),
                kind: ColumnKind::Derived,
            },
        );
        for (row, value) in self.rows.iter_mut().zip(derived) {
            row.values.insert(at, value);
        }
        Ok(())
    }

    pub(crate) fn append_columns(&mut self, columns: &[Column]) -> Result<(), TrendError> {
        for column in columns {
            if self.schema.position(&column.label).is_some() {
                return Err(TrendError::DuplicateColumn(column.label.clone()));
            }
            self.schema.push(column.clone());
        }
        Ok(())
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [SeriesRow] {
        &mut self.rows
    }
}
