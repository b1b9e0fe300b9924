use crate::trend::normalize::CategoryKey;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Ranking direction for top-K selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Highest scores first.
    Max,
    /// Lowest scores first.
    Min,
}

/// Select up to `k` categories by summed score.
///
/// Duplicate categories are summed before ranking. Ties keep first-seen
/// input order. An empty input or `k == 0` yields an empty selection.
pub fn select_top_k<I, K>(rows: I, k: usize, direction: Direction) -> Vec<CategoryKey>
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<CategoryKey>,
{
    let mut totals: Vec<(CategoryKey, f64)> = Vec::new();
    let mut index: HashMap<CategoryKey, usize> = HashMap::new();

    for (category, score) in rows {
        let key = category.into();
        if let Some(&i) = index.get(&key) {
            totals[i].1 += score;
        } else {
            index.insert(key.clone(), totals.len());
            totals.push((key, score));
        }
    }

    // sort_by is stable, so equal scores keep first-seen order
    totals.sort_by(|a, b| compare_scores(a.1, b.1, direction));

    totals.into_iter().take(k).map(|(key, _)| key).collect()
}

/// Ordering that puts the preferred score of `direction` first.
pub fn compare_scores(a: f64, b: f64, direction: Direction) -> Ordering {
    match direction {
        Direction::Max => b.total_cmp(&a),
        Direction::Min => a.total_cmp(&b),
    }
}
