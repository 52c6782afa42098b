//! Errors from graph construction and metrics computation.

use super::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("metrics pass failed: {message}")]
    MetricsFailed { message: String },
}
