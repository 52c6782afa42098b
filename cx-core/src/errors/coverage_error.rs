//! Errors from coverage profile parsing and mapping.

use super::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    #[error("invalid coverage input: {message}")]
    InvalidInput { message: String },

    #[error("coverage data conversion failed: {message}")]
    ConversionFailed { message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
