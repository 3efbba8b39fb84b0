//! Configuration for Isolation Forest training and anomaly detection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForestError;

const DEFAULT_NUM_TREES: usize = 100;
const DEFAULT_SAMPLE_SIZE: usize = 256;
const DEFAULT_THRESHOLD: f64 = 0.6;
const DEFAULT_SEED: u64 = 42;

/// Decision policy that turns anomaly scores into binary predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    /// A row is anomalous when its score reaches a fixed threshold.
    #[default]
    Threshold,
    /// A fixed fraction of each query batch is flagged, via a batch quantile.
    Proportion,
}

impl DetectionType {
    /// Return the lowercase name used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionType::Threshold => "threshold",
            DetectionType::Proportion => "proportion",
        }
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionType {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threshold" => Ok(DetectionType::Threshold),
            "proportion" => Ok(DetectionType::Proportion),
            other => Err(ForestError::UnknownDetectionType {
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for an [`IsolationForest`](crate::IsolationForest).
///
/// Numeric fields other than `seed` left at zero are unset and receive their
/// defaults from [`Options::set_default_values`], which every forest
/// constructor applies.
/// Every JSON key is optional.
///
/// # Defaults
///
/// | Parameter        | Default                    |
/// |------------------|----------------------------|
/// | `detection_type` | `Threshold`                |
/// | `threshold`      | 0.6                        |
/// | `proportion`     | unset (0.0)                |
/// | `num_trees`      | 100                        |
/// | `sample_size`    | 256                        |
/// | `max_depth`      | `ceil(log2(sample_size))`  |
/// | `seed`           | 42                         |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub(crate) detection_type: DetectionType,
    pub(crate) threshold: f64,
    pub(crate) proportion: f64,
    pub(crate) num_trees: usize,
    pub(crate) sample_size: usize,
    pub(crate) max_depth: usize,
    pub(crate) seed: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            detection_type: DetectionType::Threshold,
            threshold: 0.0,
            proportion: 0.0,
            num_trees: 0,
            sample_size: 0,
            max_depth: 0,
            seed: DEFAULT_SEED,
        }
    }
}

impl Options {
    /// Create options with every numeric field unset except `seed`, which starts at 42.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every unset field with its default.
    ///
    /// `max_depth` is derived from the (possibly just defaulted) `sample_size`.
    /// Applying this more than once has no further effect.
    pub fn set_default_values(&mut self) {
        if self.threshold == 0.0 {
            self.threshold = DEFAULT_THRESHOLD;
        }
        if self.num_trees == 0 {
            self.num_trees = DEFAULT_NUM_TREES;
        }
        if self.sample_size == 0 {
            self.sample_size = DEFAULT_SAMPLE_SIZE;
        }
        if self.max_depth == 0 {
            self.max_depth = (self.sample_size as f64).log2().ceil() as usize;
        }
    }

    /// Consume the options and return them with defaults applied.
    #[must_use]
    pub fn defaulted(mut self) -> Self {
        self.set_default_values();
        self
    }

    // --- Setters ---

    /// Set the decision policy.
    #[must_use]
    pub fn with_detection_type(mut self, detection_type: DetectionType) -> Self {
        self.detection_type = detection_type;
        self
    }

    /// Set the score cutoff used by [`DetectionType::Threshold`].
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the fraction of each batch flagged by [`DetectionType::Proportion`].
    #[must_use]
    pub fn with_proportion(mut self, proportion: f64) -> Self {
        self.proportion = proportion;
        self
    }

    /// Set the ensemble size.
    #[must_use]
    pub fn with_num_trees(mut self, num_trees: usize) -> Self {
        self.num_trees = num_trees;
        self
    }

    /// Set the number of rows drawn (with replacement) for each tree.
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Set the hard depth cap for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the decision policy.
    #[must_use]
    pub fn detection_type(&self) -> DetectionType {
        self.detection_type
    }

    /// Return the score threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Return the anomaly proportion.
    #[must_use]
    pub fn proportion(&self) -> f64 {
        self.proportion
    }

    /// Return the number of trees.
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// Return the per-tree sample size.
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Return the maximum tree depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
