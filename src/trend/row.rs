use crate::trend::error::TrendError;
use serde::{Deserialize, Serialize};

/// One dimensioned analytics observation: a metric value for a category in a
/// calendar month.
///
/// Rows sharing `(year, month, category)` are summed during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub value: f64,
}

impl MetricRow {
    /// Build a row, rejecting out-of-range months, implausible years and
    /// non-finite values.
    pub fn new(
        year: i32,
        month: u32,
        category: impl Into<String>,
        value: f64,
    ) -> Result<Self, TrendError> {
        if !(1..=12).contains(&month) {
            return Err(TrendError::MalformedRow(format!(
                "month {month} is outside 1-12"
            )));
        }
        if !(1..=9999).contains(&year) {
            return Err(TrendError::MalformedRow(format!(
                "year {year} is outside 1-9999"
            )));
        }
        if !value.is_finite() {
            return Err(TrendError::MalformedRow(format!(
                "value {value} is not a finite number"
            )));
        }
        Ok(Self {
            year,
            month,
            category: category.into(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_row() {
        let row = MetricRow::new(2024, 1, "google", 50.0).unwrap();
        assert_eq!(row.year, 2024);
        assert_eq!(row.month, 1);
        assert_eq!(row.category, "google");
    }

    #[test]
    fn test_rejects_month_zero_and_thirteen() {
        assert!(MetricRow::new(2024, 0, "x", 1.0).is_err());
        assert!(MetricRow::new(2024, 13, "x", 1.0).is_err());
    }

    #[test]
    fn test_rejects_non_finite_value() {
        assert!(MetricRow::new(2024, 5, "x", f64::NAN).is_err());
        assert!(MetricRow::new(2024, 5, "x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_year_zero() {
        let err = MetricRow::new(0, 5, "x", 1.0).unwrap_err();
        assert!(matches!(err, TrendError::MalformedRow(_)));
    }
}
