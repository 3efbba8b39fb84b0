use std::fmt;

use crate::stats::average_path_length;

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in an isolation tree.
///
/// Each node exclusively owns its children, so a tree is a strict hierarchy
/// built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// An interior random split.
    Split {
        /// Feature column the split was drawn on.
        feature: FeatureIndex,
        /// Cut value: samples with `sample[feature] < value` go left.
        value: f64,
        /// Subtree for values below the cut.
        left: Box<TreeNode>,
        /// Subtree for values at or above the cut.
        right: Box<TreeNode>,
    },
    /// A terminal node where isolation stopped.
    Leaf {
        /// Number of training rows that reached this leaf.
        size: usize,
    },
}

impl TreeNode {
    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Return the leaf size, or 0 for an interior node.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            TreeNode::Leaf { size } => *size,
            TreeNode::Split { .. } => 0,
        }
    }

    /// Return the total number of nodes in this subtree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.n_nodes() + right.n_nodes(),
        }
    }

    /// Return the number of leaves in this subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Return the depth of this subtree. A lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Path length of `sample` from this node, starting at `depth`.
    ///
    /// Follows the splits down to a leaf and returns the traversal depth plus
    /// `c(size)` for the rows the leaf never separated.
    #[must_use]
    pub fn path_length(&self, sample: &[f64], mut depth: usize) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                TreeNode::Split {
                    feature,
                    value,
                    left,
                    right,
                } => {
                    node = if sample[feature.index()] < *value {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                    depth += 1;
                }
            }
        }
    }

    /// Count, per feature, the splits `sample` passes through on its way to a leaf.
    ///
    /// The result has length `sample.len()`.
    #[must_use]
    pub fn feature_importance(&self, sample: &[f64]) -> Vec<usize> {
        let mut counts = vec![0usize; sample.len()];
        self.accumulate_importance(sample, &mut counts);
        counts
    }

    /// Add this subtree's split counts for `sample` into `counts`.
    pub(crate) fn accumulate_importance(&self, sample: &[f64], counts: &mut [usize]) {
        let mut node = self;
        while let TreeNode::Split {
            feature,
            value,
            left,
            right,
        } = node
        {
            counts[feature.index()] += 1;
            node = if sample[feature.index()] < *value {
                left.as_ref()
            } else {
                right.as_ref()
            };
        }
    }
}
