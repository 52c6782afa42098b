//! Error taxonomy, layered: one enum per subsystem, gathered under `CxError`.

mod analysis_error;
mod coverage_error;
mod cx_error;
mod daemon_error;
mod scan_error;
mod storage_error;

pub use analysis_error::AnalysisError;
pub use coverage_error::CoverageError;
pub use cx_error::CxError;
pub use daemon_error::DaemonError;
pub use scan_error::ScanError;
pub use storage_error::StorageError;

/// Convenience alias used across the workspace.
pub type CxResult<T> = Result<T, CxError>;
