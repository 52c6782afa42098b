//! # cx-daemon
//!
//! The long-lived daemon that keeps the code graph hot: PID-file
//! ownership, a single-threaded Unix-socket event loop with idle
//! shutdown, the JSON wire protocol, the client, and the store provider
//! that falls back to direct access when no daemon is reachable.

#[cfg(unix)]
pub mod client;
#[cfg(unix)]
pub mod daemon;
pub mod pidfile;
pub mod protocol;
#[cfg(unix)]
pub mod provider;
pub mod signals;

#[cfg(unix)]
pub use client::DaemonClient;
#[cfg(unix)]
pub use daemon::{Daemon, DaemonOptions, DaemonState};
pub use pidfile::PidFile;
pub use protocol::{Request, Response};
#[cfg(unix)]
pub use provider::StoreProvider;
