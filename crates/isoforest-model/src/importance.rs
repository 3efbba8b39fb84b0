//! Ranking of per-sample feature importance counts.

/// A ranked feature with name, split count, share, and rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Number of splits on this feature along the sample's paths.
    pub count: usize,
    /// Fraction of all counted splits (sums to 1.0 unless every count is zero).
    pub share: f64,
    /// 1-based rank (1 = most often used to isolate the sample).
    pub rank: usize,
}

/// Rank an importance vector from
/// [`IsolationForest::feature_importance`](crate::IsolationForest::feature_importance).
///
/// Pairs each count with its name, computes its share of the total, sorts
/// descending by count (ties keep column order), and assigns 1-based ranks.
/// Extra counts or names beyond the shorter of the two inputs are ignored.
#[must_use]
pub fn rank_features(counts: &[usize], names: &[String]) -> Vec<RankedFeature> {
    let total: usize = counts.iter().take(names.len()).sum();

    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(counts)
        .map(|(name, &count)| RankedFeature {
            name: name.clone(),
            count,
            share: if total > 0 {
                count as f64 / total as f64
            } else {
                0.0
            },
            rank: 0, // will be set after sorting
        })
        .collect();

    features.sort_by(|a, b| b.count.cmp(&a.count));

    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}
