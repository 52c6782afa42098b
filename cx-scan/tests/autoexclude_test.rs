//! Auto-exclude detector against real directory trees.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use cx_scan::detect_excludes;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

#[test]
fn nested_ecosystems_each_get_their_own_exclusion() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    touch(&root.join("Cargo.toml"));
    fs::create_dir_all(root.join("target/debug")).unwrap();

    touch(&root.join("tools/desktop/package.json"));
    fs::create_dir_all(root.join("tools/desktop/node_modules/react")).unwrap();

    touch(&root.join("tools/desktop/src-tauri/Cargo.toml"));
    fs::create_dir_all(root.join("tools/desktop/src-tauri/target")).unwrap();

    let excluded = detect_excludes(root).unwrap();
    let paths: Vec<&str> = excluded.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "target",
            "tools/desktop/node_modules",
            "tools/desktop/src-tauri/target"
        ]
    );

    // Each exclusion names its own marker in the reason.
    assert!(excluded[0].reason.contains("Cargo.toml"));
    assert!(excluded[1].reason.contains("package.json"));
}

#[test]
fn marker_without_artifact_directory_is_ignored() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(&root.join("Cargo.toml"));
    touch(&root.join("lib/package.json"));

    assert!(detect_excludes(root).unwrap().is_empty());
}

#[test]
fn go_vendor_requires_modules_txt() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    touch(&root.join("a/go.mod"));
    fs::create_dir_all(root.join("a/vendor")).unwrap();

    touch(&root.join("b/go.mod"));
    touch(&root.join("b/vendor/modules.txt"));

    let excluded = detect_excludes(root).unwrap();
    let paths: Vec<&str> = excluded.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["b/vendor"]);
    assert!(excluded[0].reason.contains("modules.txt"));
}

#[test]
fn composer_vendor_requires_autoload() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    touch(&root.join("app/composer.json"));
    touch(&root.join("app/vendor/autoload.php"));

    let excluded = detect_excludes(root).unwrap();
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].path, "app/vendor");
}

#[test]
fn pyvenv_excludes_its_own_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    touch(&root.join(".venv/pyvenv.cfg"));
    touch(&root.join(".venv/lib/site.py"));
    touch(&root.join("src/main.py"));

    let excluded = detect_excludes(root).unwrap();
    let paths: Vec<&str> = excluded.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec![".venv"]);
}

#[test]
fn directories_under_an_exclusion_are_not_rerecorded() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    // A venv that happens to contain a package.json deep inside.
    touch(&root.join("env/pyvenv.cfg"));
    touch(&root.join("env/share/demo/package.json"));
    fs::create_dir_all(root.join("env/share/demo/node_modules")).unwrap();

    let excluded = detect_excludes(root).unwrap();
    let paths: Vec<&str> = excluded.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["env"]);
}

#[test]
fn never_descends_into_hard_skipped_directories() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    // Markers hidden inside node_modules must not produce exclusions.
    touch(&root.join("package.json"));
    touch(&root.join("node_modules/pkg/Cargo.toml"));
    fs::create_dir_all(root.join("node_modules/pkg/target")).unwrap();

    let excluded = detect_excludes(root).unwrap();
    let paths: Vec<&str> = excluded.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["node_modules"]);
}
