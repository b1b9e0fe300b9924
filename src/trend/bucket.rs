use crate::trend::error::TrendError;
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

/// A calendar month slot, ordered chronologically (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthBucket {
    year: i32,
    month: u32,
}

impl MonthBucket {
    /// Returns `None` when `month` is outside 1-12.
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The bucket containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following calendar month.
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Display label in the `"MM, YYYY"` form used as the table key.
    pub fn label(self) -> String {
        self.to_string()
    }

    /// Parse a `"MM, YYYY"` label back into a bucket.
    pub fn parse_label(label: &str) -> Option<Self> {
        let (month, year) = label.split_once(',')?;
        let month: u32 = month.trim().parse().ok()?;
        let year: i32 = year.trim().parse().ok()?;
        Self::new(year, month)
    }
}

impl std::fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}, {}", self.month, self.year)
    }
}

impl Serialize for MonthBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Build the gap-free sequence of month buckets from `start`'s month through
/// `end`'s month inclusive, oldest first.
pub fn build_buckets(start: NaiveDate, end: NaiveDate) -> Result<Vec<MonthBucket>, TrendError> {
    if start > end {
        return Err(TrendError::InvalidRange { start, end });
    }

    let last = MonthBucket::from_date(end);
    let mut current = MonthBucket::from_date(start);
    let mut buckets = Vec::new();
    while current <= last {
        buckets.push(current);
        current = current.next();
    }
    Ok(buckets)
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The bucket count always equals the calendar month distance plus one,
        /// and the sequence is strictly increasing.
        #[test]
        fn prop_buckets_are_gap_free(
            start_days in 0i64..20_000,
            span_days in 0i64..3_000,
        ) {
            let epoch = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
            let start = epoch + chrono::Duration::days(start_days);
            let end = start + chrono::Duration::days(span_days);
            let buckets = build_buckets(start, end).unwrap();

            let months = (end.year() - start.year()) * 12
                + i32::try_from(end.month()).unwrap()
                - i32::try_from(start.month()).unwrap();
            prop_assert_eq!(buckets.len(), usize::try_from(months + 1).unwrap());
            for pair in buckets.windows(2) {
                prop_assert_eq!(pair[0].next(), pair[1]);
            }
        }
    }
}
