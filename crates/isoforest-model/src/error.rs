/// Errors from Isolation Forest operations.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when the configured sample size leaves the score normalization undefined.
    #[error("sample_size must be at least 2, got {sample_size}")]
    InvalidSampleSize {
        /// The invalid sample_size value.
        sample_size: usize,
    },

    /// Returned when `max_depth` exceeds the deepest tree that can be grown.
    #[error("max_depth must be at most {limit}, got {max_depth}")]
    InvalidMaxDepth {
        /// The rejected max_depth value.
        max_depth: usize,
        /// The largest accepted value for this configuration.
        limit: usize,
    },

    /// Returned when scoring is attempted before the forest has been fitted.
    #[error("isolation forest has not been fitted")]
    NotFitted,

    /// Returned when a query sample has a different number of features than the training data.
    #[error("query input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The number of features the forest was trained on.
        expected: usize,
        /// The actual number of features in the query input.
        got: usize,
    },

    /// Returned when the proportion policy is selected with a proportion outside (0, 1).
    #[error("proportion must be in (0.0, 1.0) for proportion detection, got {proportion}")]
    InvalidProportion {
        /// The invalid proportion value.
        proportion: f64,
    },

    /// Returned when a detection type name is not recognized.
    #[error("unknown detection type \"{value}\" (expected threshold or proportion)")]
    UnknownDetectionType {
        /// The unrecognized name.
        value: String,
    },
}
