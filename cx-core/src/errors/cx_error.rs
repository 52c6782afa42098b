//! Top-level error gathering every subsystem error.

use super::{AnalysisError, CoverageError, DaemonError, ScanError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum CxError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error("configuration error: {message}")]
    Config { message: String },
}
