//! Anomaly scoring, decision policies, and per-sample feature importance.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::error::ForestError;
use crate::forest::IsolationForest;
use crate::options::DetectionType;
use crate::result::Detection;
use crate::stats::{average_path_length, quantile};

impl IsolationForest {
    /// Anomaly score of a single sample, in `(0, 1]`.
    ///
    /// Averages the path length over every tree and maps it through
    /// `2^(−mean / c(sample_size))`. Scores near 1 mark points isolated after
    /// very few splits.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                               |
    /// |--------------------------------------------|------------------------------------|
    /// | [`ForestError::NotFitted`]                 | the forest has no trees            |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`       |
    pub fn score_sample(&self, sample: &[f64]) -> Result<f64, ForestError> {
        self.check_sample(sample)?;
        Ok(self.score_unchecked(sample, average_path_length(self.options.sample_size)))
    }

    /// Anomaly scores for a batch of samples, in input order.
    ///
    /// Rows are scored in parallel; each row walks the trees in build order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`IsolationForest::score_sample`], for any row.
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn score(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        if !self.is_fitted() {
            return Err(ForestError::NotFitted);
        }
        for sample in features {
            self.check_sample(sample)?;
        }

        let normalizer = average_path_length(self.options.sample_size);
        Ok(features
            .par_iter()
            .map(|sample| self.score_unchecked(sample, normalizer))
            .collect())
    }

    /// Score a batch and classify every row under the configured policy.
    ///
    /// - [`DetectionType::Threshold`]: the cutoff is the configured threshold.
    /// - [`DetectionType::Proportion`]: the cutoff is the `1 − proportion`
    ///   quantile of this batch's own scores.
    ///
    /// A row is anomalous when its score is at or above the cutoff. The batch
    /// is scored once and the scores reused for the cutoff.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                        |
    /// |--------------------------------------------|---------------------------------------------|
    /// | [`ForestError::InvalidProportion`]         | proportion policy with proportion ∉ (0, 1)  |
    /// | [`ForestError::NotFitted`]                 | the forest has no trees                     |
    /// | [`ForestError::PredictionFeatureMismatch`] | any row has the wrong feature count         |
    #[instrument(skip_all, fields(n_samples = features.len(), policy = %self.options.detection_type))]
    pub fn detect(&self, features: &[Vec<f64>]) -> Result<Detection, ForestError> {
        let detection_type = self.options.detection_type;
        if detection_type == DetectionType::Proportion {
            let proportion = self.options.proportion;
            if !(proportion > 0.0 && proportion < 1.0) {
                return Err(ForestError::InvalidProportion { proportion });
            }
        }

        let scores = self.score(features)?;
        let threshold = match detection_type {
            DetectionType::Threshold => Some(self.options.threshold),
            DetectionType::Proportion => quantile(&scores, 1.0 - self.options.proportion),
        };
        let labels: Vec<u8> = match threshold {
            Some(cutoff) => scores.iter().map(|&s| u8::from(s >= cutoff)).collect(),
            None => Vec::new(),
        };

        debug!(
            threshold,
            n_anomalies = labels.iter().filter(|&&l| l == 1).count(),
            "batch classified"
        );

        Ok(Detection {
            scores,
            labels,
            threshold,
            detection_type,
        })
    }

    /// Binary predictions for a batch: 1 for anomalies, 0 otherwise.
    ///
    /// # Errors
    ///
    /// Same conditions as [`IsolationForest::detect`].
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<u8>, ForestError> {
        Ok(self.detect(features)?.labels)
    }

    /// Per-feature split counts for `sample`, summed over every tree.
    ///
    /// Entry `j` counts how many splits on feature `j` the sample crossed on
    /// its way to a leaf, across the whole ensemble. Raw counts, bounded by
    /// `num_trees × max_depth` in total.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                               |
    /// |--------------------------------------------|------------------------------------|
    /// | [`ForestError::NotFitted`]                 | the forest has no trees            |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`       |
    pub fn feature_importance(&self, sample: &[f64]) -> Result<Vec<usize>, ForestError> {
        self.check_sample(sample)?;
        let mut counts = vec![0usize; self.n_features];
        for tree in &self.trees {
            tree.accumulate_importance(sample, &mut counts);
        }
        Ok(counts)
    }

    fn score_unchecked(&self, sample: &[f64], normalizer: f64) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample, 0))
            .sum();
        let mean = total / self.trees.len() as f64;
        2f64.powf(-mean / normalizer)
    }

    fn check_sample(&self, sample: &[f64]) -> Result<(), ForestError> {
        if !self.is_fitted() {
            return Err(ForestError::NotFitted);
        }
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }
}
