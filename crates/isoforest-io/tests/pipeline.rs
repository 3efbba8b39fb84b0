//! End-to-end integration tests: CSV -> fit -> detect/explain -> JSON.

use std::fs;
use std::path::Path;

use isoforest_io::{ExperimentName, MatrixReader, ResultWriter, load_options};
use isoforest_model::{DetectionType, IsolationForest, rank_features};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fitted_forest() -> IsolationForest {
    let train = MatrixReader::new(&fixture_path("train_2d.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(train.n_rows(), 256);
    assert_eq!(train.feature_names, vec!["temperature", "pressure"]);

    let options = load_options(&fixture_path("options.json")).expect("options should parse");
    let mut forest = IsolationForest::with_options(options);
    forest.fit(&train.rows).unwrap();
    forest
}

#[test]
fn detection_round_trip() {
    // 1. Read training data and options, fit
    let forest = fitted_forest();
    assert_eq!(forest.n_trees(), 100);
    assert_eq!(forest.options().sample_size(), 128);
    assert_eq!(forest.options().max_depth(), 7);

    // 2. Read query batch and detect
    let query = MatrixReader::new(&fixture_path("query_2d.csv")).read().unwrap();
    let detection = forest.detect(&query.rows).unwrap();

    // 3. Write JSON artifact
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("detect_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_detection(&query, &detection).unwrap();

    // 4. Deserialize back and verify
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(content["experiment"], "detect_rt");
    assert_eq!(content["detection_type"], "threshold");
    assert_eq!(content["n_rows"].as_u64().unwrap(), 6);

    let threshold = forest.options().threshold();
    assert!((content["threshold"].as_f64().unwrap() - threshold).abs() < 1e-12);

    let rows = content["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 6);
    let scores: Vec<f64> = rows.iter().map(|e| e["score"].as_f64().unwrap()).collect();
    for (entry, &score) in rows.iter().zip(&scores) {
        assert!(score > 0.0 && score <= 1.0, "score {score} out of range");
        assert_eq!(entry["anomaly"].as_bool().unwrap(), score >= threshold);
    }

    // Rows 2 and 4 lie outside the training grid; a point past the grid's
    // high corner isolates exactly like that corner, so compare against the
    // in-grid rows rather than an absolute score.
    let inlier_max = [0, 1, 3, 5]
        .iter()
        .map(|&i| scores[i])
        .fold(f64::MIN, f64::max);
    assert!(scores[2] > inlier_max, "scores {scores:?}");
    assert!(scores[4] > inlier_max, "scores {scores:?}");

    let flagged: Vec<u64> = rows
        .iter()
        .filter(|e| e["anomaly"].as_bool().unwrap())
        .map(|e| e["row"].as_u64().unwrap())
        .collect();
    assert_eq!(flagged, vec![2, 4]);
}

#[test]
fn proportion_round_trip() {
    let train = MatrixReader::new(&fixture_path("train_2d.csv")).read().unwrap();
    let options = load_options(&fixture_path("options.json"))
        .unwrap()
        .with_detection_type(DetectionType::Proportion)
        .with_proportion(0.1);
    let mut forest = IsolationForest::with_options(options);
    forest.fit(&train.rows).unwrap();

    // Score the training set itself: about 10% flagged.
    let detection = forest.detect(&train.rows).unwrap();
    let flagged = detection.n_anomalies();
    assert!((20..=32).contains(&flagged), "flagged {flagged} of 256");

    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("proportion_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_detection(&train, &detection).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["detection_type"], "proportion");
    assert_eq!(content["n_anomalies"].as_u64().unwrap(), flagged as u64);
    let threshold = content["threshold"].as_f64().unwrap();
    assert!((threshold - detection.threshold.unwrap()).abs() < 1e-12);
}

#[test]
fn explain_round_trip() {
    let forest = fitted_forest();
    let query = MatrixReader::new(&fixture_path("query_2d.csv")).read().unwrap();

    // Row 2 lies far outside the training grid.
    let counts = forest.feature_importance(&query.rows[2]).unwrap();
    let ranked = rank_features(&counts, &query.feature_names);

    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("explain_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_importance(2, &ranked).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["row"].as_u64().unwrap(), 2);

    let total = content["total_splits"].as_u64().unwrap();
    assert_eq!(total as usize, counts.iter().sum::<usize>());
    assert!(total as usize <= forest.n_trees() * forest.options().max_depth());

    let features = content["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    let shares: f64 = features.iter().map(|f| f["share"].as_f64().unwrap()).sum();
    assert!((shares - 1.0).abs() < 1e-9);
    assert_eq!(features[0]["rank"].as_u64().unwrap(), 1);
    assert!(features[0]["count"].as_u64().unwrap() >= features[1]["count"].as_u64().unwrap());
}

#[test]
fn mismatched_query_width_rejected() {
    let forest = fitted_forest();
    let err = forest.detect(&[vec![1.0, 2.0, 3.0]]).unwrap_err();
    assert!(err.to_string().contains("expected 2"), "{err}");
}
