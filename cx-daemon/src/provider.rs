//! Daemon-or-direct store access.
//!
//! Selection: daemon children and `use_daemon = false` go direct;
//! otherwise reuse a reachable daemon or spawn one and wait for health;
//! on connect-time failure, fall back to a direct store when allowed.
//! The provider owns whichever resource it returned; double-close is
//! safe.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, info, warn};

use cx_core::config::CxConfig;
use cx_core::errors::DaemonError;
use cx_core::paths;
use cx_storage::Store;

use crate::client::DaemonClient;

/// How the provider ended up reaching the store.
enum Mode {
    Daemon(DaemonClient),
    Direct(Store),
}

/// A resolved store access path: exactly one of client or store.
pub struct StoreProvider {
    mode: Option<Mode>,
}

impl StoreProvider {
    /// Resolve using the process environment for the child marker and
    /// the default daemon socket path.
    pub fn get(project_root: &Path, config: &CxConfig) -> Result<Self, DaemonError> {
        let is_child = std::env::var(paths::DAEMON_CHILD_ENV).is_ok();
        Self::resolve(
            project_root,
            config,
            &paths::daemon_socket_path(),
            is_child,
        )
    }

    /// Explicit-parameter form, used by `get` and by tests.
    pub fn resolve(
        project_root: &Path,
        config: &CxConfig,
        socket_path: &Path,
        daemon_child: bool,
    ) -> Result<Self, DaemonError> {
        let store_dir = paths::store_dir(project_root);

        // Spawn-storm guard: children never spawn another daemon.
        if daemon_child || !config.daemon.use_daemon {
            debug!("direct store access ({})", if daemon_child { "daemon child" } else { "daemon disabled" });
            return Self::direct(&store_dir);
        }

        match Self::ensure_daemon(&store_dir, config, socket_path) {
            Ok(client) => Ok(Self {
                mode: Some(Mode::Daemon(client)),
            }),
            Err(e) if config.daemon.with_fallback => {
                warn!("daemon unavailable ({e}), falling back to direct store");
                Self::direct(&store_dir)
            }
            Err(e) => Err(e),
        }
    }

    fn direct(store_dir: &Path) -> Result<Self, DaemonError> {
        let store = Store::open(store_dir)?;
        Ok(Self {
            mode: Some(Mode::Direct(store)),
        })
    }

    /// Reuse a reachable daemon or spawn one and wait for health.
    fn ensure_daemon(
        store_dir: &Path,
        config: &CxConfig,
        socket_path: &Path,
    ) -> Result<DaemonClient, DaemonError> {
        let client = DaemonClient::new(socket_path, &config.daemon);
        if client.is_healthy() {
            debug!("reusing running daemon at {}", socket_path.display());
            return Ok(client);
        }

        spawn_daemon(store_dir)?;
        client.wait_healthy(Duration::from_millis(config.daemon.start_timeout_ms))?;
        info!("spawned daemon for {}", store_dir.display());
        Ok(client)
    }

    /// The direct store, when in direct mode.
    pub fn store(&self) -> Option<&Store> {
        match &self.mode {
            Some(Mode::Direct(store)) => Some(store),
            _ => None,
        }
    }

    /// The daemon client, when in daemon mode.
    pub fn client(&self) -> Option<&DaemonClient> {
        match &self.mode {
            Some(Mode::Daemon(client)) => Some(client),
            _ => None,
        }
    }

    /// Release the owned resource. Idempotent.
    pub fn close(&mut self) {
        self.mode = None;
    }
}

/// Launch the daemon executable detached from this process group, with
/// the child marker set so it can never recursively spawn.
fn spawn_daemon(store_dir: &Path) -> Result<(), DaemonError> {
    let exe = daemon_executable();
    let mut command = Command::new(&exe);
    command
        .arg(store_dir)
        .env(paths::DAEMON_CHILD_ENV, "1")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    command.spawn().map_err(|e| DaemonError::Unavailable {
        message: format!("spawn daemon '{}': {e}", exe.display()),
    })?;
    Ok(())
}

/// The daemon binary: a `cxd` sibling of the current executable, else
/// whatever `cxd` resolves to on PATH.
fn daemon_executable() -> PathBuf {
    if let Ok(current) = std::env::current_exe() {
        let sibling = current.with_file_name("cxd");
        if sibling.is_file() {
            return sibling;
        }
    }
    PathBuf::from("cxd")
}
