//! Store provider selection: daemon reuse, fallback, child guard.

#![cfg(unix)]

use std::time::Duration;

use tempfile::TempDir;

use cx_core::config::CxConfig;
use cx_core::model::entity::{Entity, EntityType};
use cx_daemon::{Daemon, DaemonClient, DaemonOptions, StoreProvider};
use cx_storage::Store;

fn config(use_daemon: bool, with_fallback: bool) -> CxConfig {
    let mut config = CxConfig::default();
    config.daemon.use_daemon = use_daemon;
    config.daemon.with_fallback = with_fallback;
    // Spawning can't succeed in the test environment; fail fast.
    config.daemon.start_timeout_ms = 200;
    config
}

#[test]
fn disabled_daemon_resolves_direct() {
    let root = TempDir::new().unwrap();
    let socket = root.path().join("absent.sock");

    let provider =
        StoreProvider::resolve(root.path(), &config(false, true), &socket, false).unwrap();
    assert!(provider.store().is_some());
    assert!(provider.client().is_none());
}

#[test]
fn unreachable_daemon_with_fallback_resolves_direct() {
    let root = TempDir::new().unwrap();
    let socket = root.path().join("absent.sock");

    let provider =
        StoreProvider::resolve(root.path(), &config(true, true), &socket, false).unwrap();
    assert!(provider.store().is_some());
    assert!(provider.client().is_none());
}

#[test]
fn unreachable_daemon_without_fallback_is_an_error() {
    let root = TempDir::new().unwrap();
    let socket = root.path().join("absent.sock");

    let result = StoreProvider::resolve(root.path(), &config(true, false), &socket, false);
    assert!(result.is_err());
}

#[test]
fn daemon_children_always_go_direct() {
    let root = TempDir::new().unwrap();
    let socket = root.path().join("absent.sock");

    // Even with the daemon enabled and no fallback, the child marker
    // forces direct access (the spawn-storm guard).
    let provider =
        StoreProvider::resolve(root.path(), &config(true, false), &socket, true).unwrap();
    assert!(provider.store().is_some());
    assert!(provider.client().is_none());
}

#[test]
fn reachable_daemon_is_reused() {
    let root = TempDir::new().unwrap();
    let store_dir = cx_core::paths::store_dir(root.path());
    let socket = root.path().join("daemon.sock");
    let pid = root.path().join("daemon.pid");

    // Seed the store and run a daemon for it.
    let store = Store::open(&store_dir).unwrap();
    store
        .bulk_insert_entities(&[Entity::new(
            "solo",
            EntityType::Function,
            "src/app.go",
            1,
            "func solo()",
        )])
        .unwrap();
    drop(store);

    let daemon = Daemon::start(DaemonOptions {
        store_dir,
        socket_path: socket.clone(),
        pid_path: pid,
        config: CxConfig::default(),
    })
    .unwrap();
    let handle = std::thread::spawn(move || daemon.run());
    DaemonClient::new(&socket, &CxConfig::default().daemon)
        .wait_healthy(Duration::from_secs(5))
        .unwrap();

    let mut provider =
        StoreProvider::resolve(root.path(), &config(true, false), &socket, false).unwrap();
    let client = provider.client().expect("daemon mode expected");
    assert!(provider.store().is_none());

    let count = client
        .query("count", Vec::new(), serde_json::Map::new())
        .unwrap();
    assert_eq!(count["entities"], 1);

    client.stop().unwrap();
    handle.join().unwrap().unwrap();

    // Close is idempotent.
    provider.close();
    provider.close();
}
