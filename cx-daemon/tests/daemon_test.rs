//! End-to-end daemon tests over a real Unix socket.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use cx_core::config::CxConfig;
use cx_core::errors::DaemonError;
use cx_core::model::entity::{Entity, EntityType};
use cx_daemon::{Daemon, DaemonClient, DaemonOptions};
use cx_storage::Store;

struct TestPaths {
    store_dir: PathBuf,
    socket: PathBuf,
    pid: PathBuf,
}

fn test_paths(dir: &TempDir) -> TestPaths {
    TestPaths {
        store_dir: dir.path().join("store"),
        socket: dir.path().join("daemon.sock"),
        pid: dir.path().join("daemon.pid"),
    }
}

fn seed_store(store_dir: &Path, names: &[&str]) {
    let store = Store::open(store_dir).unwrap();
    let entities: Vec<Entity> = names
        .iter()
        .map(|n| Entity::new(*n, EntityType::Function, "src/app.go", 1, format!("func {n}()")))
        .collect();
    store.bulk_insert_entities(&entities).unwrap();
    store.reindex_search().unwrap();
}

fn options(paths: &TestPaths, idle_secs: u64) -> DaemonOptions {
    let mut config = CxConfig::default();
    config.daemon.idle_timeout_secs = idle_secs;
    DaemonOptions {
        store_dir: paths.store_dir.clone(),
        socket_path: paths.socket.clone(),
        pid_path: paths.pid.clone(),
        config,
    }
}

fn client_for(paths: &TestPaths) -> DaemonClient {
    DaemonClient::new(&paths.socket, &CxConfig::default().daemon)
}

#[test]
fn health_status_query_stop_round_trip() {
    let dir = TempDir::new().unwrap();
    let paths = test_paths(&dir);
    seed_store(&paths.store_dir, &["alpha", "beta"]);

    let daemon = Daemon::start(options(&paths, 0)).unwrap();
    let handle = std::thread::spawn(move || daemon.run());

    let client = client_for(&paths);
    client.wait_healthy(Duration::from_secs(5)).unwrap();

    let status = client.status().unwrap();
    assert_eq!(status["entities"], 2);
    assert_eq!(status["graph_nodes"], 2);
    assert_eq!(status["state"], "running");
    // Idle shutdown disabled: no deadline reported.
    assert!(status["shutdown_in_secs"].is_null());

    let hits = client
        .query("search", vec!["alpha".to_string()], serde_json::Map::new())
        .unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["name"], "alpha");

    let count = client
        .query("count", Vec::new(), serde_json::Map::new())
        .unwrap();
    assert_eq!(count["entities"], 2);

    client.stop().unwrap();
    handle.join().unwrap().unwrap();

    // Graceful shutdown removed the named resources.
    assert!(!paths.socket.exists());
    assert!(!paths.pid.exists());
}

#[test]
fn unknown_command_is_an_error_response_not_a_disconnect() {
    let dir = TempDir::new().unwrap();
    let paths = test_paths(&dir);
    seed_store(&paths.store_dir, &["only"]);

    let daemon = Daemon::start(options(&paths, 0)).unwrap();
    let handle = std::thread::spawn(move || daemon.run());
    let client = client_for(&paths);
    client.wait_healthy(Duration::from_secs(5)).unwrap();

    let err = client
        .query("frobnicate", Vec::new(), serde_json::Map::new())
        .unwrap_err();
    assert!(matches!(err, DaemonError::Remote { .. }));

    // The daemon is still serving afterwards.
    assert!(client.is_healthy());

    client.stop().unwrap();
    handle.join().unwrap().unwrap();
}

#[test]
fn idle_timeout_triggers_graceful_shutdown() {
    let dir = TempDir::new().unwrap();
    let paths = test_paths(&dir);
    seed_store(&paths.store_dir, &["one"]);

    let daemon = Daemon::start(options(&paths, 1)).unwrap();
    let handle = std::thread::spawn(move || daemon.run());

    let client = client_for(&paths);
    client.wait_healthy(Duration::from_secs(5)).unwrap();

    // No further requests: the daemon should wind down on its own.
    handle.join().unwrap().unwrap();
    assert!(!paths.socket.exists());
    assert!(!paths.pid.exists());
}

#[test]
fn second_daemon_on_same_pid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let paths = test_paths(&dir);
    seed_store(&paths.store_dir, &["one"]);

    let daemon = Daemon::start(options(&paths, 0)).unwrap();
    let handle = std::thread::spawn(move || daemon.run());
    let client = client_for(&paths);
    client.wait_healthy(Duration::from_secs(5)).unwrap();

    match Daemon::start(options(&paths, 0)) {
        Err(DaemonError::AlreadyRunning { pid }) => assert_eq!(pid, std::process::id()),
        other => panic!("expected AlreadyRunning, got {:?}", other.map(|_| ())),
    }

    client.stop().unwrap();
    handle.join().unwrap().unwrap();
}

#[test]
fn stale_socket_file_is_reclaimed_on_start() {
    let dir = TempDir::new().unwrap();
    let paths = test_paths(&dir);
    seed_store(&paths.store_dir, &["one"]);

    // Leftover socket from a crashed daemon.
    std::fs::write(&paths.socket, b"stale").unwrap();

    let daemon = Daemon::start(options(&paths, 0)).unwrap();
    let handle = std::thread::spawn(move || daemon.run());

    let client = client_for(&paths);
    client.wait_healthy(Duration::from_secs(5)).unwrap();
    client.stop().unwrap();
    handle.join().unwrap().unwrap();
}

#[cfg(unix)]
#[test]
fn socket_permissions_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let paths = test_paths(&dir);
    seed_store(&paths.store_dir, &["one"]);

    let daemon = Daemon::start(options(&paths, 0)).unwrap();
    let mode = std::fs::metadata(&paths.socket).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    drop(daemon);
}
