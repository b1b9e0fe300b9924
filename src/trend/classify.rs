use crate::trend::table::SeriesTable;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Five-level position of a value relative to its column's distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendClass {
    PositiveHighOutlier,
    PositiveMildOutlier,
    Average,
    NegativeMildOutlier,
    NegativeHighOutlier,
}

impl TrendClass {
    /// Classify `value` against a column mean and sample standard deviation.
    ///
    /// A value exactly one deviation above the mean is `Average`; exactly one
    /// below is a mild outlier. A zero (or undefined) deviation classifies
    /// everything as `Average`.
    #[allow(clippy::float_cmp)]
    pub fn from_stats(value: f64, mean: f64, std_dev: f64) -> Self {
        if std_dev == 0.0 || !std_dev.is_finite() {
            return Self::Average;
        }
        if value == mean + std_dev {
            return Self::Average;
        }
        if value > mean + std_dev {
            Self::PositiveHighOutlier
        } else if value > mean + std_dev / 2.0 {
            Self::PositiveMildOutlier
        } else if value < mean - std_dev {
            Self::NegativeHighOutlier
        } else if value < mean - std_dev / 2.0 {
            Self::NegativeMildOutlier
        } else {
            Self::Average
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PositiveHighOutlier => "positive-high-outlier",
            Self::PositiveMildOutlier => "positive-mild-outlier",
            Self::Average => "average",
            Self::NegativeMildOutlier => "negative-mild-outlier",
            Self::NegativeHighOutlier => "negative-high-outlier",
        }
    }
}

impl std::fmt::Display for TrendClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic mean and sample standard deviation of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnStats {
    /// Fewer than two values give a zero deviation.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        if values.len() < 2 {
            return Self { mean, std_dev: 0.0 };
        }
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// Classification of one numeric column, one entry per table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTrend {
    #[serde(skip)]
    pub column: String,
    pub stats: ColumnStats,
    pub classes: Vec<TrendClass>,
}

/// Per-column trend classes for a whole table, in column order.
///
/// Serializes as a map from column header to its statistics and classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendAnnotations {
    columns: Vec<ColumnTrend>,
}

impl Serialize for TrendAnnotations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            map.serialize_entry(&column.column, column)?;
        }
        map.end()
    }
}

impl TrendAnnotations {
    pub fn get(&self, column: &str) -> Option<&[TrendClass]> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.classes.as_slice())
    }

    pub fn columns(&self) -> &[ColumnTrend] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Classify every numeric column of `table` against its own statistics over
/// all rows.
pub fn classify(table: &SeriesTable) -> TrendAnnotations {
    let columns = table
        .schema()
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let values: Vec<f64> = table.rows().iter().map(|r| r.values[i]).collect();
            let stats = ColumnStats::from_values(&values);
            let classes = values
                .iter()
                .map(|&v| TrendClass::from_stats(v, stats.mean, stats.std_dev))
                .collect();
            ColumnTrend {
                column: column.label.clone(),
                stats,
                classes,
            }
        })
        .collect();
    TrendAnnotations { columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::bucket::MonthBucket;
    use crate::trend::table::{Schema, SeriesRow};

    fn single_column(values: &[f64]) -> SeriesTable {
        let mut bucket = MonthBucket::new(2024, 1).unwrap();
        let rows = values
            .iter()
            .map(|&v| {
                let row = SeriesRow {
                    bucket,
                    values: vec![v],
                };
                bucket = bucket.next();
                row
            })
            .collect();
        SeriesTable::from_parts(Schema::for_categories(["v"]), rows).unwrap()
    }

    #[test]
    fn test_sample_standard_deviation() {
        let stats = ColumnStats::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert!((stats.mean - 22.0).abs() < 1e-9);
        assert!((stats.std_dev - 1902.5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_outlier_column() {
        let table = single_column(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let annotations = classify(&table);
        // rows are most recent first: 100, 4, 3, 2, 1
        let classes = annotations.get("v").unwrap();
        assert_eq!(classes[0], TrendClass::PositiveHighOutlier);
        assert!(classes[1..].iter().all(|c| *c == TrendClass::Average));
    }

    #[test]
    fn test_value_at_upper_bound_is_not_high_outlier() {
        let stats = ColumnStats::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let at_bound = stats.mean + stats.std_dev;
        let class = TrendClass::from_stats(at_bound, stats.mean, stats.std_dev);
        assert_eq!(class, TrendClass::Average);
        let below = TrendClass::from_stats(at_bound - 1.0, stats.mean, stats.std_dev);
        assert_eq!(below, TrendClass::PositiveMildOutlier);
    }

    #[test]
    fn test_bands() {
        assert_eq!(TrendClass::from_stats(11.5, 10.0, 2.0), TrendClass::PositiveMildOutlier);
        assert_eq!(TrendClass::from_stats(12.0, 10.0, 2.0), TrendClass::Average);
        assert_eq!(TrendClass::from_stats(11.0, 10.0, 2.0), TrendClass::Average);
        assert_eq!(TrendClass::from_stats(9.0, 10.0, 2.0), TrendClass::Average);
        assert_eq!(TrendClass::from_stats(8.5, 10.0, 2.0), TrendClass::NegativeMildOutlier);
        assert_eq!(TrendClass::from_stats(8.0, 10.0, 2.0), TrendClass::NegativeMildOutlier);
        assert_eq!(TrendClass::from_stats(12.0 - 1e-9, 10.0, 2.0), TrendClass::PositiveMildOutlier);
        assert_eq!(TrendClass::from_stats(7.9, 10.0, 2.0), TrendClass::NegativeHighOutlier);
        assert_eq!(TrendClass::from_stats(12.1, 10.0, 2.0), TrendClass::PositiveHighOutlier);
    }

    #[test]
    fn test_value_at_lower_bound_is_mild_outlier() {
        let stats = ColumnStats::from_values(&[1.0, 0.0, 2.0]);
        assert_eq!(
            TrendClass::from_stats(0.0, stats.mean, stats.std_dev),
            TrendClass::NegativeMildOutlier
        );
        assert_eq!(
            TrendClass::from_stats(2.0, stats.mean, stats.std_dev),
            TrendClass::Average
        );
    }

    #[test]
    fn test_zero_variance_is_average() {
        let table = single_column(&[5.0, 5.0, 5.0]);
        let annotations = classify(&table);
        assert!(annotations
            .get("v")
            .unwrap()
            .iter()
            .all(|c| *c == TrendClass::Average));
    }

    #[test]
    fn test_single_row_is_average() {
        let table = single_column(&[42.0]);
        assert_eq!(classify(&table).get("v").unwrap(), &[TrendClass::Average]);
    }

    #[test]
    fn test_annotations_serialize_by_column() {
        let table = single_column(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let json = serde_json::to_value(classify(&table)).unwrap();
        assert_eq!(json["v"]["classes"][0], "positive-high-outlier");
        assert!((json["v"]["stats"]["mean"].as_f64().unwrap() - 22.0).abs() < 1e-9);
        assert!(json["v"].get("column").is_none());
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&TrendClass::NegativeMildOutlier).unwrap();
        assert_eq!(json, "\"negative-mild-outlier\"");
        assert_eq!(TrendClass::Average.to_string(), "average");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Away from the exact upper one-deviation point, classes are monotone
        /// in the value for fixed statistics.
        #[test]
        fn prop_classification_is_monotone(
            a in -1000.0f64..1000.0,
            b in -1000.0f64..1000.0,
            mean in -100.0f64..100.0,
            std_dev in 0.0f64..200.0,
        ) {
            fn rank(c: TrendClass) -> u8 {
                match c {
                    TrendClass::NegativeHighOutlier => 0,
                    TrendClass::NegativeMildOutlier => 1,
                    TrendClass::Average => 2,
                    TrendClass::PositiveMildOutlier => 3,
                    TrendClass::PositiveHighOutlier => 4,
                }
            }
            let bound = mean + std_dev;
            prop_assume!(a != bound && b != bound);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                rank(TrendClass::from_stats(lo, mean, std_dev))
                    <= rank(TrendClass::from_stats(hi, mean, std_dev))
            );
        }
    }
}
