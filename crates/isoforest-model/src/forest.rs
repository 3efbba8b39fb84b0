//! Isolation Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::error::ForestError;
use crate::node::TreeNode;
use crate::options::Options;
use crate::stats::sample;
use crate::tree::{build_tree, check_max_depth, validate_features};

/// An ensemble of isolation trees and the options it was configured with.
///
/// Build with [`IsolationForest::new`] or [`IsolationForest::with_options`],
/// train with [`IsolationForest::fit`], then score or predict query batches.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub(crate) options: Options,
    pub(crate) trees: Vec<TreeNode>,
    pub(crate) n_features: usize,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl IsolationForest {
    /// Create an unfitted forest with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::new())
    }

    /// Create an unfitted forest with `options`, defaulting any unset field.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self {
            options: options.defaulted(),
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// Train the ensemble on `features`, replacing any previously fitted trees.
    ///
    /// `features[sample_idx][feature_idx]`, row-major. Each of the
    /// `num_trees` trees is grown in parallel on its own bootstrap sample of
    /// `sample_size` rows, drawn with replacement from a random stream seeded
    /// for that tree alone. Returns once every tree is built.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                               |
    /// |---------------------------------------|------------------------------------|
    /// | [`ForestError::InvalidSampleSize`]    | `sample_size` is below 2           |
    /// | [`ForestError::InvalidMaxDepth`]      | `max_depth` above `sample_size` or [`MAX_TREE_DEPTH`](crate::MAX_TREE_DEPTH) |
    /// | [`ForestError::EmptyDataset`]         | `features` is empty                |
    /// | [`ForestError::ZeroFeatures`]         | rows have zero feature columns     |
    /// | [`ForestError::FeatureCountMismatch`] | rows have inconsistent lengths     |
    /// | [`ForestError::NonFiniteValue`]       | any value is NaN or infinite       |
    #[instrument(skip_all, fields(n_trees = self.options.num_trees, n_samples = features.len()))]
    pub fn fit(&mut self, features: &[Vec<f64>]) -> Result<(), ForestError> {
        let Options {
            num_trees,
            sample_size,
            max_depth,
            seed,
            ..
        } = self.options;

        if sample_size < 2 {
            return Err(ForestError::InvalidSampleSize { sample_size });
        }
        check_max_depth(max_depth, sample_size)?;
        let n_features = validate_features(features)?;
        let n_samples = features.len();

        if n_samples < sample_size {
            // Scores are still normalized by c(sample_size).
            warn!(n_samples, sample_size, "training set is smaller than sample_size");
        }

        info!(
            num_trees,
            n_samples,
            n_features,
            sample_size,
            max_depth,
            "training isolation forest"
        );

        // Generate per-tree seeds from master RNG.
        let mut master_rng = ChaCha8Rng::seed_from_u64(seed);
        let tree_seeds: Vec<u64> = (0..num_trees).map(|_| master_rng.r#gen()).collect();

        let rows: Vec<&[f64]> = features.iter().map(Vec::as_slice).collect();

        // Slot i of the collected Vec holds the tree built from tree_seeds[i].
        let trees: Vec<TreeNode> = tree_seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);
                let bootstrap = sample(&rows, sample_size, &mut rng);
                build_tree(&bootstrap, 0, max_depth, &mut rng)
            })
            .collect();

        debug!(
            n_trees_trained = trees.len(),
            n_nodes = trees.iter().map(TreeNode::n_nodes).sum::<usize>(),
            "tree training complete"
        );

        self.trees = trees;
        self.n_features = n_features;
        Ok(())
    }

    /// Borrow the (defaulted) options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Borrow the root of every fitted tree, in build order.
    #[must_use]
    pub fn trees(&self) -> &[TreeNode] {
        &self.trees
    }

    /// Return the number of fitted trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of features seen during fitting (0 before fitting).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return `true` once [`IsolationForest::fit`] has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ForestError;
    use crate::options::Options;

    use super::IsolationForest;

    /// A tight block of points around the origin.
    fn make_block() -> Vec<Vec<f64>> {
        (0..100)
            .map(|i| vec![(i % 10) as f64 * 0.1, (i / 10) as f64 * 0.1])
            .collect()
    }

    #[test]
    fn new_applies_defaults() {
        let forest = IsolationForest::new();
        assert_eq!(forest.options().num_trees(), 100);
        assert_eq!(forest.options().sample_size(), 256);
        assert_eq!(forest.options().max_depth(), 8);
        assert!(!forest.is_fitted());
    }

    #[test]
    fn fit_builds_requested_tree_count() {
        let mut forest = IsolationForest::with_options(Options::new().with_num_trees(17));
        forest.fit(&make_block()).unwrap();
        assert_eq!(forest.n_trees(), 17);
        assert_eq!(forest.n_features(), 2);
        assert!(forest.is_fitted());
    }

    #[test]
    fn trees_respect_max_depth() {
        let opts = Options::new()
            .with_num_trees(20)
            .with_sample_size(64)
            .with_max_depth(3);
        let mut forest = IsolationForest::with_options(opts);
        forest.fit(&make_block()).unwrap();
        assert!(forest.trees().iter().all(|t| t.depth() <= 3));
    }

    #[test]
    fn refit_replaces_trees() {
        let mut forest = IsolationForest::with_options(Options::new().with_num_trees(5));
        forest.fit(&make_block()).unwrap();
        let first = forest.trees().to_vec();

        let shifted: Vec<Vec<f64>> = make_block()
            .into_iter()
            .map(|row| row.into_iter().map(|v| v + 100.0).collect())
            .collect();
        forest.fit(&shifted).unwrap();
        assert_eq!(forest.n_trees(), 5);
        assert_ne!(forest.trees(), first.as_slice());
    }

    #[test]
    fn deterministic_with_same_seed() {
        let opts = Options::new().with_num_trees(10).with_seed(99);
        let mut a = IsolationForest::with_options(opts.clone());
        let mut b = IsolationForest::with_options(opts);
        a.fit(&make_block()).unwrap();
        b.fit(&make_block()).unwrap();
        assert_eq!(a.trees(), b.trees());
    }

    #[test]
    fn different_seeds_differ() {
        let mut a = IsolationForest::with_options(Options::new().with_num_trees(10).with_seed(1));
        let mut b = IsolationForest::with_options(Options::new().with_num_trees(10).with_seed(2));
        a.fit(&make_block()).unwrap();
        b.fit(&make_block()).unwrap();
        assert_ne!(a.trees(), b.trees());
    }

    #[test]
    fn sample_size_larger_than_dataset() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 0.5]];
        let mut forest = IsolationForest::with_options(Options::new().with_num_trees(4));
        forest.fit(&data).unwrap();
        assert_eq!(forest.n_trees(), 4);
    }

    #[test]
    fn empty_dataset_error() {
        let mut forest = IsolationForest::new();
        let err = forest.fit(&[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
        assert!(!forest.is_fitted());
    }

    #[test]
    fn ragged_rows_error() {
        let mut forest = IsolationForest::new();
        let err = forest.fit(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, ForestError::FeatureCountMismatch { .. }));
    }

    #[test]
    fn max_depth_above_sample_size_rejected() {
        let duplicates = vec![vec![1.0, 1.0]; 10];
        let opts = Options::new().with_sample_size(16).with_max_depth(200_000);
        let mut forest = IsolationForest::with_options(opts);
        let err = forest.fit(&duplicates).unwrap_err();
        assert!(matches!(
            err,
            ForestError::InvalidMaxDepth {
                max_depth: 200_000,
                limit: 16
            }
        ));
        assert!(!forest.is_fitted());
    }

    #[test]
    fn duplicate_rows_fit_at_depth_limit() {
        let duplicates = vec![vec![1.0, 1.0]; 10];
        let opts = Options::new()
            .with_num_trees(4)
            .with_sample_size(16)
            .with_max_depth(16);
        let mut forest = IsolationForest::with_options(opts);
        forest.fit(&duplicates).unwrap();
        assert!(forest.trees().iter().all(|t| t.depth() == 16));
    }

    #[test]
    fn sample_size_one_rejected() {
        let mut forest = IsolationForest::with_options(Options::new().with_sample_size(1));
        let err = forest.fit(&make_block()).unwrap_err();
        assert!(matches!(err, ForestError::InvalidSampleSize { sample_size: 1 }));
    }
}
