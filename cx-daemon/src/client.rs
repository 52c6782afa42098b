//! Socket client: one connection per round-trip, bounded deadlines,
//! health polling with exponential back-off.

use std::io::BufReader;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use cx_core::config::DaemonConfig;
use cx_core::errors::DaemonError;

use crate::protocol::{read_message, write_message, Request, Response};

const BACKOFF_START: Duration = Duration::from_millis(50);
const BACKOFF_CAP: Duration = Duration::from_secs(1);

/// Talks to a running daemon over its Unix socket.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: &Path, config: &DaemonConfig) -> Self {
        Self {
            socket_path: socket_path.to_path_buf(),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            write_timeout: Duration::from_secs(config.write_timeout_secs),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// One request, one response, connection closed.
    pub fn request(&self, request: &Request) -> Result<Response, DaemonError> {
        let stream = UnixStream::connect(&self.socket_path).map_err(|e| {
            DaemonError::Unavailable {
                message: format!("connect {}: {e}", self.socket_path.display()),
            }
        })?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.write_timeout))?;

        let mut writer = stream.try_clone()?;
        write_message(&mut writer, request)?;

        let mut reader = BufReader::new(stream);
        read_message(&mut reader)
    }

    /// Health check. Any connect or protocol failure reads as "not
    /// reachable", never an error.
    pub fn is_healthy(&self) -> bool {
        matches!(self.request(&Request::Health), Ok(response) if response.success)
    }

    pub fn status(&self) -> Result<Value, DaemonError> {
        unwrap_data(self.request(&Request::Status)?)
    }

    /// A structured query. A live daemon returning an error response
    /// surfaces that error unchanged.
    pub fn query(
        &self,
        command: &str,
        args: Vec<String>,
        options: serde_json::Map<String, Value>,
    ) -> Result<Value, DaemonError> {
        unwrap_data(self.request(&Request::Query {
            command: command.to_string(),
            args,
            options,
        })?)
    }

    /// Ask the daemon to shut down gracefully.
    pub fn stop(&self) -> Result<(), DaemonError> {
        self.request(&Request::Stop).map(|_| ())
    }

    /// Poll health with exponential back-off (50 ms doubling to a 1 s
    /// cap) until `deadline` elapses.
    pub fn wait_healthy(&self, deadline: Duration) -> Result<(), DaemonError> {
        let started = Instant::now();
        let mut backoff = BACKOFF_START;
        loop {
            if self.is_healthy() {
                debug!("daemon healthy after {:?}", started.elapsed());
                return Ok(());
            }
            if started.elapsed() >= deadline {
                return Err(DaemonError::Timeout {
                    what: format!("daemon readiness after {deadline:?}"),
                });
            }
            std::thread::sleep(backoff.min(deadline.saturating_sub(started.elapsed())));
            backoff = (backoff * 2).min(BACKOFF_CAP);
        }
    }
}

/// A failed response becomes the daemon's own error message.
fn unwrap_data(response: Response) -> Result<Value, DaemonError> {
    if response.success {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(DaemonError::Remote {
            message: response
                .error
                .unwrap_or_else(|| "daemon reported failure without a message".to_string()),
        })
    }
}
