use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ForestError,
    node::{FeatureIndex, TreeNode},
    stats::{column, min_max},
};

/// Hard cap on tree depth, independent of the sample size.
///
/// Duplicate rows keep splitting degenerately until `max_depth`, one frame of
/// recursion per level, so the cap bounds stack use while building and
/// dropping a tree.
pub const MAX_TREE_DEPTH: usize = 1024;

/// Configuration for a single isolation tree.
///
/// Construct via [`IsolationTreeConfig::new`], then chain `with_*` methods.
/// Trees inside an [`IsolationForest`](crate::IsolationForest) are built from
/// the forest's own options; this builder is for growing a tree on its own.
///
/// # Defaults
///
/// | Parameter   | Default                     |
/// |-------------|-----------------------------|
/// | `max_depth` | `ceil(log2(n_samples))`     |
/// | `seed`      | 42                          |
#[derive(Debug, Clone)]
pub struct IsolationTreeConfig {
    pub(crate) max_depth: Option<usize>,
    pub(crate) seed: u64,
}

impl IsolationTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: None,
            seed: 42,
        }
    }

    /// Set the maximum tree depth (root is depth 0).
    ///
    /// `None` derives the cap from the number of training rows.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the maximum depth limit, if set.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Grow an isolation tree on every row of `features`.
    ///
    /// `features[sample_idx][feature_idx]`, row-major. No subsampling
    /// is applied here.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                               |
    /// |---------------------------------------|------------------------------------|
    /// | [`ForestError::EmptyDataset`]         | `features` is empty                |
    /// | [`ForestError::ZeroFeatures`]         | rows have zero feature columns     |
    /// | [`ForestError::FeatureCountMismatch`] | rows have inconsistent lengths     |
    /// | [`ForestError::NonFiniteValue`]       | any value is NaN or infinite       |
    /// | [`ForestError::InvalidMaxDepth`]      | `max_depth` above [`MAX_TREE_DEPTH`] |
    #[instrument(skip(self, features), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>]) -> Result<IsolationTree, ForestError> {
        if let Some(max_depth) = self.max_depth {
            check_max_depth(max_depth, MAX_TREE_DEPTH)?;
        }
        let n_features = validate_features(features)?;
        let max_depth = self
            .max_depth
            .unwrap_or_else(|| (features.len() as f64).log2().ceil() as usize);

        let rows: Vec<&[f64]> = features.iter().map(Vec::as_slice).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let root = build_tree(&rows, 0, max_depth, &mut rng);

        debug!(
            n_nodes = root.n_nodes(),
            depth = root.depth(),
            max_depth,
            "isolation tree built"
        );

        Ok(IsolationTree { root, n_features })
    }
}

impl Default for IsolationTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject a depth cap above `limit` (itself clamped to [`MAX_TREE_DEPTH`]).
pub(crate) fn check_max_depth(max_depth: usize, limit: usize) -> Result<(), ForestError> {
    let limit = limit.min(MAX_TREE_DEPTH);
    if max_depth > limit {
        return Err(ForestError::InvalidMaxDepth { max_depth, limit });
    }
    Ok(())
}

/// Check that `features` is a non-empty, rectangular, finite matrix.
///
/// Returns the feature count on success.
pub(crate) fn validate_features(features: &[Vec<f64>]) -> Result<usize, ForestError> {
    let first = features.first().ok_or(ForestError::EmptyDataset)?;
    let n_features = first.len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }

    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(ForestError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }

    Ok(n_features)
}

/// Recursively grow an isolation tree on `rows`, starting at `depth`.
///
/// Stops with a leaf once the partition is empty, holds a single row, or
/// `depth` reaches `max_depth`. Otherwise picks a random feature and a cut
/// drawn uniformly from `[min, max)` of that feature over the partition.
/// A constant column (`min == max`) still splits: every row goes right.
pub(crate) fn build_tree(
    rows: &[&[f64]],
    depth: usize,
    max_depth: usize,
    rng: &mut impl Rng,
) -> TreeNode {
    let n_rows = rows.len();
    if depth >= max_depth || n_rows <= 1 {
        return TreeNode::Leaf { size: n_rows };
    }

    let feature = rng.gen_range(0..rows[0].len());
    let Some((min, max)) = min_max(&column(rows, feature)) else {
        return TreeNode::Leaf { size: n_rows };
    };
    let value = min + rng.r#gen::<f64>() * (max - min);

    let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
        rows.iter().copied().partition(|row| row[feature] < value);

    TreeNode::Split {
        feature: FeatureIndex::new(feature),
        value,
        left: Box::new(build_tree(&left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right, depth + 1, max_depth, rng)),
    }
}

/// A fitted isolation tree together with the feature count it was grown on.
#[derive(Debug, Clone)]
pub struct IsolationTree {
    pub(crate) root: TreeNode,
    pub(crate) n_features: usize,
}

impl IsolationTree {
    /// Borrow the root node.
    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Return the number of features the tree was grown on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Path length of `sample` from the root.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn path_length(&self, sample: &[f64]) -> Result<f64, ForestError> {
        self.check_sample(sample)?;
        Ok(self.root.path_length(sample, 0))
    }

    /// Per-feature split counts along the path of `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn feature_importance(&self, sample: &[f64]) -> Result<Vec<usize>, ForestError> {
        self.check_sample(sample)?;
        Ok(self.root.feature_importance(sample))
    }

    fn check_sample(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }
}
