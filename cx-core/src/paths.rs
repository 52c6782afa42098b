//! On-disk layout: per-project store under `.cx/`, per-user daemon files.

use std::path::{Path, PathBuf};

/// Directory holding the versioned store for a project root.
pub fn store_dir(project_root: &Path) -> PathBuf {
    project_root.join(".cx").join("cortex")
}

/// Configuration file for a project root.
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(".cx").join("config.yaml")
}

fn user_cx_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cx")
}

/// The daemon's listening socket.
pub fn daemon_socket_path() -> PathBuf {
    user_cx_dir().join("daemon.sock")
}

/// The daemon's PID file.
pub fn daemon_pid_path() -> PathBuf {
    user_cx_dir().join("daemon.pid")
}

/// Environment marker set on daemon children to break spawn loops.
pub const DAEMON_CHILD_ENV: &str = "CX_DAEMON_CHILD";
