//! File I/O, validation, and serialization for the isoforest pipeline.

mod domain;
mod error;
mod options;
mod reader;
mod writer;

pub use domain::{Dataset, ExperimentName};
pub use error::IoError;
pub use options::load_options;
pub use reader::MatrixReader;
pub use writer::ResultWriter;
