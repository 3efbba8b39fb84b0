//! CSV feature matrix reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::Dataset;

/// Reads a numeric feature matrix from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one name per feature column
/// - `f0,f1,...,fn`
/// - One row per sample, all rows must have the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct MatrixReader {
    path: PathBuf,
}

impl MatrixReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that short or long rows reach our own
        // InconsistentRowLength check instead of a bare CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let feature_names: Vec<String> = header.iter().map(str::to_string).collect();
        let expected = feature_names.len();
        debug!(expected, "read CSV header");

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            let mut values = Vec::with_capacity(expected);
            for (col_index, raw) in record.iter().enumerate() {
                match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => values.push(value),
                    _ => {
                        return Err(IoError::NonFiniteValue {
                            path: self.path.clone(),
                            row_index,
                            col_index,
                            raw: raw.to_string(),
                        });
                    }
                }
            }
            rows.push(values);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_rows = rows.len(), n_features = expected, "dataset loaded");

        Ok(Dataset {
            feature_names,
            rows,
        })
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
