//! Isolation Forest anomaly detection: fit, score, predict, explain.
//!
//! Provides an Isolation Forest over dense real-valued vectors: random
//! axis-aligned isolation trees grown in parallel via rayon on seeded
//! bootstrap samples, path-length anomaly scores in `(0, 1]`, threshold and
//! batch-proportion decision policies, and per-sample feature importance.

mod error;
mod forest;
mod importance;
mod node;
mod options;
mod result;
mod score;
pub mod stats;
mod tree;

pub use error::ForestError;
pub use forest::IsolationForest;
pub use importance::{RankedFeature, rank_features};
pub use node::{FeatureIndex, TreeNode};
pub use options::{DetectionType, Options};
pub use result::Detection;
pub use tree::{IsolationTree, IsolationTreeConfig, MAX_TREE_DEPTH};
