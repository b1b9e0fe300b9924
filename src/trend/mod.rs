pub mod aggregate;
pub mod bucket;
pub mod chart;
pub mod classify;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod row;
pub mod table;
pub mod topk;

pub use aggregate::aggregate;
pub use bucket::{build_buckets, MonthBucket};
pub use chart::{build_axis_range, build_chart, AxisRange, ChartOptions, ChartSpec};
pub use classify::{classify, TrendAnnotations, TrendClass};
pub use error::TrendError;
pub use merge::{merge, merge_all};
pub use normalize::{CategoryKey, Normalizer, Predicate, Rule};
pub use row::MetricRow;
pub use table::{Schema, SeriesTable};
pub use topk::{select_top_k, Direction};
