//! The daemon: `Idle → Starting → Running → ShuttingDown → Terminated`.
//!
//! Startup acquires the PID file, opens the store, builds the graph, and
//! binds an owner-only Unix socket. The run loop is single-threaded and
//! cooperative: one connection is decoded, dispatched, answered, and
//! closed before the next accept. Every request resets the idle timer;
//! idle expiry triggers the same graceful shutdown as a signal or a
//! `stop` request.

use std::io::BufReader;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info, warn};

use cx_analysis::CodeGraph;
use cx_core::config::CxConfig;
use cx_core::errors::DaemonError;
use cx_core::model::entity::EntityFilter;
use cx_storage::Store;

use crate::pidfile::PidFile;
use crate::protocol::{read_message, write_message, Request, Response};
use crate::signals;

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Daemon lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// Where the daemon finds its store and named resources.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub store_dir: PathBuf,
    pub socket_path: PathBuf,
    pub pid_path: PathBuf,
    pub config: CxConfig,
}

/// A started daemon, holding the only live store handle and graph.
pub struct Daemon {
    options: DaemonOptions,
    store: Store,
    graph: CodeGraph,
    listener: UnixListener,
    pidfile: PidFile,
    state: DaemonState,
    started_at: Instant,
    last_activity: Instant,
    stop_requested: bool,
    terminated: bool,
}

impl Daemon {
    /// Starting phase: exclusive lock, store, graph, socket, signals.
    pub fn start(options: DaemonOptions) -> Result<Self, DaemonError> {
        let pidfile = PidFile::acquire(&options.pid_path)?;

        let store = Store::open(&options.store_dir)?;
        let graph = CodeGraph::build(&store).map_err(|e| DaemonError::Unavailable {
            message: format!("initial graph build: {e}"),
        })?;

        if options.socket_path.exists() {
            // A previous owner died without cleanup; the PID check above
            // proved no daemon is live.
            let _ = std::fs::remove_file(&options.socket_path);
        }
        if let Some(parent) = options.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&options.socket_path)?;
        std::fs::set_permissions(&options.socket_path, std::fs::Permissions::from_mode(0o600))?;
        listener.set_nonblocking(true)?;

        signals::register();

        info!(
            "daemon starting: store {}, socket {}, pid {}",
            options.store_dir.display(),
            options.socket_path.display(),
            std::process::id()
        );
        Ok(Self {
            options,
            store,
            graph,
            listener,
            pidfile,
            state: DaemonState::Starting,
            started_at: Instant::now(),
            last_activity: Instant::now(),
            stop_requested: false,
            terminated: false,
        })
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Running phase: the cooperative accept loop, until a stop request,
    /// a shutdown signal, or idle expiry. Always ends terminated.
    pub fn run(mut self) -> Result<(), DaemonError> {
        self.state = DaemonState::Running;
        let idle_limit = self.idle_limit();

        loop {
            if self.stop_requested || signals::shutdown_requested() {
                info!("shutdown requested");
                break;
            }
            if let Some(limit) = idle_limit {
                if self.last_activity.elapsed() >= limit {
                    info!("idle timeout reached ({}s)", limit.as_secs());
                    break;
                }
            }

            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    self.last_activity = Instant::now();
                    if let Err(e) = self.handle_connection(stream) {
                        warn!("connection failed: {e}");
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    warn!("accept failed: {e}");
                    std::thread::sleep(ACCEPT_POLL);
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn idle_limit(&self) -> Option<Duration> {
        let secs = self.options.config.daemon.idle_timeout_secs;
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// One connection: decode one request, dispatch, encode one
    /// response, close.
    fn handle_connection(&mut self, stream: UnixStream) -> Result<(), DaemonError> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_secs(
            self.options.config.daemon.read_timeout_secs,
        )))?;
        stream.set_write_timeout(Some(Duration::from_secs(
            self.options.config.daemon.write_timeout_secs,
        )))?;

        let mut reader = BufReader::new(stream.try_clone()?);
        let request: Request = read_message(&mut reader)?;
        debug!("request: {request:?}");

        let response = self.dispatch(&request);
        let mut stream = stream;
        write_message(&mut stream, &response)?;
        Ok(())
    }

    fn dispatch(&mut self, request: &Request) -> Response {
        match request {
            Request::Health => Response::ok(json!({
                "healthy": true,
                "pid": std::process::id(),
                "uptime_secs": self.started_at.elapsed().as_secs(),
            })),
            Request::Status => self.status_response(),
            Request::Query {
                command,
                args,
                options,
            } => self.query_response(command, args, options),
            Request::Stop => {
                self.stop_requested = true;
                Response::ok(json!({ "stopping": true }))
            }
        }
    }

    fn status_response(&self) -> Response {
        let stats = match self.store.stats() {
            Ok(stats) => stats,
            Err(e) => return Response::err(e.to_string()),
        };
        let idle_secs = self.last_activity.elapsed().as_secs();
        let shutdown_in_secs = self
            .idle_limit()
            .map(|limit| limit.as_secs().saturating_sub(idle_secs));
        Response::ok(json!({
            "state": "running",
            "pid": std::process::id(),
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "idle_secs": idle_secs,
            "shutdown_in_secs": shutdown_in_secs,
            "entities": stats.active_entities,
            "archived": stats.archived_entities,
            "dependencies": stats.dependencies,
            "commits": stats.commits,
            "graph_nodes": self.graph.node_count(),
            "graph_edges": self.graph.edge_count(),
            "graph_built_at": self.graph.built_at().to_rfc3339(),
        }))
    }

    /// Route a structured query. The command set mirrors the read
    /// surface of the store; anything unknown is a client error, not a
    /// daemon failure.
    fn query_response(
        &mut self,
        command: &str,
        args: &[String],
        options: &serde_json::Map<String, serde_json::Value>,
    ) -> Response {
        let limit = options
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(10) as usize;

        let result = match command {
            "search" => match args.first() {
                None => Err("search needs a query argument".to_string()),
                Some(query) => self
                    .store
                    .search(query, limit, &self.options.config.search)
                    .map(|hits| {
                        json!(hits
                            .iter()
                            .map(|h| json!({
                                "id": h.entity_id,
                                "name": h.name,
                                "file": h.file_path,
                                "line": h.line_start,
                                "score": h.combined_score,
                            }))
                            .collect::<Vec<_>>())
                    })
                    .map_err(|e| e.to_string()),
            },
            "entity" => match args.first() {
                None => Err("entity needs an id argument".to_string()),
                Some(id) => self
                    .store
                    .get_entity(id)
                    .map(|e| serde_json::to_value(e).unwrap_or_default())
                    .map_err(|e| e.to_string()),
            },
            "log" => self
                .store
                .log(limit)
                .map(|commits| {
                    json!(commits
                        .iter()
                        .map(|c| json!({
                            "hash": c.hash,
                            "committer": c.committer,
                            "date": c.created_at,
                            "message": c.message,
                        }))
                        .collect::<Vec<_>>())
                })
                .map_err(|e| e.to_string()),
            "gaps" => {
                let top_n = options.get("top_n").and_then(|v| v.as_u64()).map(|n| n as usize);
                cx_analysis::gaps::analyze_gaps(
                    &self.store,
                    &self.options.config.metrics,
                    self.options.config.coverage.gap_threshold,
                    top_n,
                    false,
                )
                .map(|report| serde_json::to_value(report).unwrap_or_default())
                .map_err(|e| e.to_string())
            }
            "refresh_graph" => CodeGraph::build(&self.store)
                .map(|graph| {
                    self.graph = graph;
                    json!({
                        "graph_nodes": self.graph.node_count(),
                        "graph_edges": self.graph.edge_count(),
                    })
                })
                .map_err(|e| e.to_string()),
            "count" => self
                .store
                .count_entities(&EntityFilter::default())
                .map(|n| json!({ "entities": n }))
                .map_err(|e| e.to_string()),
            other => Err(format!("unknown command '{other}'")),
        };

        match result {
            Ok(data) => Response::ok(data),
            Err(message) => Response::err(message),
        }
    }

    /// ShuttingDown phase: release the socket, store, and PID file.
    /// Idempotent; also runs on drop.
    fn shutdown(&mut self) {
        if self.terminated {
            return;
        }
        self.state = DaemonState::ShuttingDown;
        let _ = std::fs::remove_file(&self.options.socket_path);
        self.pidfile.release();
        self.terminated = true;
        self.state = DaemonState::Terminated;
        info!("daemon terminated");
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}
