//! JSON options file loading.

use std::path::Path;

use isoforest_model::Options;
use tracing::{debug, instrument};

use crate::IoError;

/// Load [`Options`] from a JSON file.
///
/// Every key is optional; unknown keys and unknown detection types are
/// rejected. The returned options are not yet defaulted, so callers can still
/// layer overrides on top before handing them to a forest.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::ConfigParse`] | Not valid options JSON |
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_options(path: &Path) -> Result<Options, IoError> {
    let text = std::fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let options: Options = serde_json::from_str(&text).map_err(|e| IoError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(?options, "options loaded");
    Ok(options)
}
