//! PID-file based process exclusivity. A stale file (recorded PID not
//! alive) is reclaimed; a live one means another daemon owns the lock.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use cx_core::errors::DaemonError;

/// Ownership of the daemon PID file for the lifetime of this value.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    released: bool,
}

impl PidFile {
    /// Acquire exclusivity. Fails with `AlreadyRunning` when the
    /// recorded PID is alive; otherwise any stale file is replaced.
    pub fn acquire(path: &Path) -> Result<Self, DaemonError> {
        if let Some(recorded) = read_pid(path) {
            if process_alive(recorded) {
                return Err(DaemonError::AlreadyRunning { pid: recorded });
            }
            warn!("removing stale pid file for dead process {recorded}");
            let _ = std::fs::remove_file(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, std::process::id().to_string())?;
        debug!("acquired pid file at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            released: false,
        })
    }

    /// Remove the file if it still records this process. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if read_pid(&self.path) == Some(std::process::id()) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.release();
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
}

/// Signal-0 liveness probe. EPERM still means the process exists.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}
