//! Detection result types for Isolation Forest.

use crate::options::DetectionType;

/// Scores, cutoff, and binary labels for one query batch.
///
/// `scores[i]` and `labels[i]` both refer to input row `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Anomaly score of each row, in `(0, 1]`.
    pub scores: Vec<f64>,
    /// 1 for rows at or above the cutoff, 0 otherwise.
    pub labels: Vec<u8>,
    /// The cutoff applied. `None` only for an empty batch under the
    /// proportion policy, where no quantile exists.
    pub threshold: Option<f64>,
    /// The policy that produced the cutoff.
    pub detection_type: DetectionType,
}

impl Detection {
    /// Return the number of rows in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Return `true` when the batch had no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Return the number of rows labelled anomalous.
    #[must_use]
    pub fn n_anomalies(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Return the indices of all rows labelled anomalous, in input order.
    #[must_use]
    pub fn anomaly_indices(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| if l == 1 { Some(i) } else { None })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_detection() -> Detection {
        Detection {
            scores: vec![0.4, 0.7, 0.55, 0.9],
            labels: vec![0, 1, 0, 1],
            threshold: Some(0.6),
            detection_type: DetectionType::Threshold,
        }
    }

    #[test]
    fn counts_anomalies() {
        let d = make_detection();
        assert_eq!(d.len(), 4);
        assert!(!d.is_empty());
        assert_eq!(d.n_anomalies(), 2);
    }

    #[test]
    fn anomaly_indices_in_order() {
        assert_eq!(make_detection().anomaly_indices(), vec![1, 3]);
    }
}
