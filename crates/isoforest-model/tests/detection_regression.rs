//! Detection regression tests for isoforest-model.
//!
//! These tests verify that algorithmic changes do not degrade anomaly
//! detection on deterministic synthetic datasets.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use isoforest_model::{DetectionType, IsolationForest, Options};

// ---------------------------------------------------------------------------
// Helper: deterministic Gaussian cluster
// ---------------------------------------------------------------------------

/// Generate `n` 2-D points from N(0, 1) per coordinate.
fn make_cluster(n: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..n)
        .map(|_| vec![normal.sample(&mut rng), normal.sample(&mut rng)])
        .collect()
}

fn fitted_forest(options: Options, seed: u64) -> IsolationForest {
    let mut forest = IsolationForest::with_options(options.with_seed(seed));
    forest.fit(&make_cluster(256, seed)).unwrap();
    forest
}

// ---------------------------------------------------------------------------
// a) outlier_outscores_centroid
// ---------------------------------------------------------------------------

/// A far outlier must score above the cluster centroid on every seed tried.
#[test]
fn outlier_outscores_centroid() {
    let options = Options::new().with_num_trees(100).with_sample_size(256);
    for seed in [1, 7, 42, 1234, 98765] {
        let forest = fitted_forest(options.clone(), seed);
        let scores = forest
            .score(&[vec![0.0, 0.0], vec![50.0, 50.0]])
            .unwrap();
        assert!(
            scores[1] > scores[0],
            "seed {seed}: outlier {} <= centroid {}",
            scores[1],
            scores[0]
        );
        assert!(scores[1] > 0.6, "seed {seed}: outlier score {}", scores[1]);
        assert!(scores[0] < 0.55, "seed {seed}: centroid score {}", scores[0]);
    }
}

// ---------------------------------------------------------------------------
// b) default_threshold_flags_outliers_only
// ---------------------------------------------------------------------------

/// Under the default threshold policy, far outliers are flagged and the
/// centroid is not.
#[test]
fn default_threshold_flags_outliers_only() {
    let forest = fitted_forest(Options::new(), 42);
    let queries = vec![
        vec![0.0, 0.0],
        vec![50.0, 50.0],
        vec![-40.0, 3.0],
        vec![0.2, -0.1],
    ];
    let predictions = forest.predict(&queries).unwrap();
    assert_eq!(predictions, vec![0, 1, 1, 0]);
}

// ---------------------------------------------------------------------------
// c) scores_bounded
// ---------------------------------------------------------------------------

/// Every score lies in (0, 1], including for extreme queries.
#[test]
fn scores_bounded() {
    let forest = fitted_forest(Options::new(), 42);
    let mut queries = make_cluster(200, 3);
    queries.push(vec![1e9, -1e9]);
    queries.push(vec![0.0, 0.0]);
    for (i, score) in forest.score(&queries).unwrap().into_iter().enumerate() {
        assert!(score > 0.0 && score <= 1.0, "row {i}: score {score}");
    }
}

// ---------------------------------------------------------------------------
// d) proportion_policy_count
// ---------------------------------------------------------------------------

/// With proportion p over n distinct-scored rows, about p * n rows are flagged.
#[test]
fn proportion_policy_count() {
    let options = Options::new()
        .with_detection_type(DetectionType::Proportion)
        .with_proportion(0.05);
    let forest = fitted_forest(options, 42);
    let queries = make_cluster(400, 11);
    let flagged: usize = forest
        .predict(&queries)
        .unwrap()
        .iter()
        .map(|&l| usize::from(l))
        .sum();
    assert!(
        (15..=25).contains(&flagged),
        "flagged {flagged} of 400 at proportion 0.05"
    );
}

// ---------------------------------------------------------------------------
// e) deterministic_scores
// ---------------------------------------------------------------------------

/// Same options and seed must produce identical scores across two fits.
#[test]
fn deterministic_scores() {
    let queries = make_cluster(50, 5);
    let a = fitted_forest(Options::new(), 99).score(&queries).unwrap();
    let b = fitted_forest(Options::new(), 99).score(&queries).unwrap();
    assert_eq!(a, b, "scores differ across runs with the same seed");
}

/// Proportion-policy predictions are identical across two fits with the same
/// seed, and so is the resolved cutoff.
#[test]
fn deterministic_proportion_predictions() {
    let options = Options::new()
        .with_detection_type(DetectionType::Proportion)
        .with_proportion(0.1);
    let queries = make_cluster(300, 17);
    let a = fitted_forest(options.clone(), 99).detect(&queries).unwrap();
    let b = fitted_forest(options.clone(), 99).detect(&queries).unwrap();
    assert_eq!(a.labels, b.labels, "labels differ across runs with the same seed");
    assert_eq!(a.threshold, b.threshold);

    let predicted = fitted_forest(options, 99).predict(&queries).unwrap();
    assert_eq!(predicted, a.labels);
}

// ---------------------------------------------------------------------------
// f) feature_importance_bounds
// ---------------------------------------------------------------------------

/// Per-sample importance sums to at most num_trees * max_depth, and a point
/// far from the cluster crosses fewer splits in total than the centroid.
#[test]
fn feature_importance_bounds() {
    let options = Options::new().with_num_trees(100);
    let forest = fitted_forest(options, 42);
    let max_depth = forest.options().max_depth();

    let outlier: usize = forest.feature_importance(&[0.0, 30.0]).unwrap().iter().sum();
    let centroid: usize = forest.feature_importance(&[0.0, 0.0]).unwrap().iter().sum();
    assert!(outlier <= 100 * max_depth, "outlier total {outlier}");
    assert!(centroid <= 100 * max_depth, "centroid total {centroid}");
    assert!(outlier < centroid, "outlier {outlier} >= centroid {centroid}");
}
