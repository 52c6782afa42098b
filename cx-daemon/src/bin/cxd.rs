//! `cxd` — the daemon process. Takes the store directory as its only
//! argument (defaulting to `.cx/cortex` under the working directory) and
//! serves until stopped, signaled, or idle.

#![cfg(unix)]

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use cx_core::{paths, CxConfig};
use cx_daemon::{Daemon, DaemonOptions};

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".cx/cortex"));

    // The config lives two levels above the store dir by convention
    // (<root>/.cx/cortex); fall back to defaults anywhere else.
    let project_root = store_dir
        .parent()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = match CxConfig::load(&project_root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cxd: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let options = DaemonOptions {
        store_dir,
        socket_path: paths::daemon_socket_path(),
        pid_path: paths::daemon_pid_path(),
        config,
    };

    match Daemon::start(options).and_then(Daemon::run) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cxd: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
