//! JSON result writer for detection and feature importance outputs.

use std::fs;
use std::path::{Path, PathBuf};

use isoforest_model::{Detection, RankedFeature};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{Dataset, ExperimentName};

/// Writes detection and explanation results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_scores.json` and
/// `{experiment}_importance.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write per-row scores and labels to `{experiment}_scores.json`.
    ///
    /// `dataset` is the scored batch; its rows line up with `detection`.
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_rows = detection.len()))]
    pub fn write_detection(
        &self,
        dataset: &Dataset,
        detection: &Detection,
    ) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("scores");

        let rows: Vec<ScoreEntry> = detection
            .scores
            .iter()
            .zip(&detection.labels)
            .enumerate()
            .map(|(row, (&score, &label))| ScoreEntry {
                row,
                score,
                anomaly: label == 1,
            })
            .collect();

        let artifact = DetectionArtifact {
            experiment: self.experiment.as_str(),
            detection_type: detection.detection_type.as_str(),
            threshold: detection.threshold,
            n_rows: dataset.n_rows(),
            n_anomalies: detection.n_anomalies(),
            feature_names: &dataset.feature_names,
            rows,
        };

        Self::write_json(&path, &artifact)?;
        info!(path = %path.display(), "detection result written");
        Ok(path)
    }

    /// Write the ranked feature importance of one row to
    /// `{experiment}_importance.json`.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(row = row))]
    pub fn write_importance(
        &self,
        row: usize,
        ranked: &[RankedFeature],
    ) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("importance");

        let features: Vec<FeatureEntry> = ranked
            .iter()
            .map(|f| FeatureEntry {
                name: f.name.as_str(),
                count: f.count,
                share: f.share,
                rank: f.rank,
            })
            .collect();

        let artifact = ImportanceArtifact {
            experiment: self.experiment.as_str(),
            row,
            total_splits: ranked.iter().map(|f| f.count).sum(),
            features,
        };

        Self::write_json(&path, &artifact)?;
        info!(path = %path.display(), "importance result written");
        Ok(path)
    }

    fn artifact_path(&self, kind: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct DetectionArtifact<'a> {
    experiment: &'a str,
    detection_type: &'static str,
    threshold: Option<f64>,
    n_rows: usize,
    n_anomalies: usize,
    feature_names: &'a [String],
    rows: Vec<ScoreEntry>,
}

#[derive(Serialize)]
struct ScoreEntry {
    row: usize,
    score: f64,
    anomaly: bool,
}

#[derive(Serialize)]
struct ImportanceArtifact<'a> {
    experiment: &'a str,
    row: usize,
    total_splits: usize,
    features: Vec<FeatureEntry<'a>>,
}

#[derive(Serialize)]
struct FeatureEntry<'a> {
    name: &'a str,
    count: usize,
    share: f64,
    rank: usize,
}
