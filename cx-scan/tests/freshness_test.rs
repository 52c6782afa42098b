//! Incremental freshness decisions backed by a real store.

use std::collections::HashMap;

use tempfile::TempDir;

use cx_scan::{changed_files, hash_file, is_file_changed, prune_stale};
use cx_storage::Store;

fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (dir, store)
}

#[test]
fn unknown_files_always_need_scanning() {
    let (_dir, store) = temp_store();
    assert!(is_file_changed(&store, "src/new.go", "abc").unwrap());
}

#[test]
fn matching_hash_means_fresh() {
    let (_dir, store) = temp_store();
    let mut hashes = HashMap::new();
    hashes.insert("src/a.go".to_string(), "h1".to_string());
    store.upsert_file_hashes(&hashes).unwrap();

    assert!(!is_file_changed(&store, "src/a.go", "h1").unwrap());
    assert!(is_file_changed(&store, "src/a.go", "h2").unwrap());
}

#[test]
fn changed_files_is_the_bulk_predicate() {
    let (_dir, store) = temp_store();
    let mut recorded = HashMap::new();
    recorded.insert("a.go".to_string(), "h1".to_string());
    recorded.insert("b.go".to_string(), "h2".to_string());
    store.upsert_file_hashes(&recorded).unwrap();

    let mut current = HashMap::new();
    current.insert("a.go".to_string(), "h1".to_string()); // fresh
    current.insert("b.go".to_string(), "different".to_string()); // changed
    current.insert("c.go".to_string(), "h3".to_string()); // new

    assert_eq!(
        changed_files(&store, &current).unwrap(),
        vec!["b.go".to_string(), "c.go".to_string()]
    );
}

#[test]
fn prune_returns_removed_count() {
    let (_dir, store) = temp_store();
    let mut recorded = HashMap::new();
    recorded.insert("a.go".to_string(), "h1".to_string());
    recorded.insert("gone.go".to_string(), "h2".to_string());
    store.upsert_file_hashes(&recorded).unwrap();

    assert_eq!(prune_stale(&store, &["a.go".to_string()]).unwrap(), 1);
    // Losing an index row only forces a rescan.
    assert!(is_file_changed(&store, "gone.go", "h2").unwrap());
}

#[test]
fn hash_file_tracks_content_not_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("f.go");
    std::fs::write(&path, b"package main").unwrap();
    let first = hash_file(&path).unwrap();

    // Rewriting identical bytes leaves the hash alone.
    std::fs::write(&path, b"package main").unwrap();
    assert_eq!(hash_file(&path).unwrap(), first);

    std::fs::write(&path, b"package main // changed").unwrap();
    assert_ne!(hash_file(&path).unwrap(), first);
}
