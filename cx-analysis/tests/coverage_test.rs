//! Coverage mapping integration: profile → normalized paths → entity
//! line overlap → persisted rows, with the covered-wins merge rule.

use tempfile::TempDir;

use cx_analysis::coverage::{import_profile, map_blocks, parse_profile_str};
use cx_core::config::CoverageConfig;
use cx_core::model::entity::{Entity, EntityType};
use cx_storage::Store;

fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (dir, store)
}

fn ranged_entity(name: &str, file: &str, start: u32, end: u32) -> Entity {
    let mut e = Entity::new(name, EntityType::Function, file, start, format!("func {name}()"));
    e.line_end = Some(end);
    e
}

#[test]
fn profile_blocks_map_onto_entity_ranges() {
    let (_dir, store) = temp_store();
    let login = ranged_entity("login", "internal/auth/login.go", 45, 67);
    let logout = ranged_entity("logout", "internal/auth/login.go", 70, 80);
    store
        .bulk_insert_entities(&[login.clone(), logout.clone()])
        .unwrap();

    let profile = "mode: set\n\
        github.com/user/project/internal/auth/login.go:45.1,67.2 5 1\n\
        github.com/user/project/internal/auth/login.go:70.1,75.2 3 0\n";
    let blocks = parse_profile_str(profile).unwrap();
    let (rows, summary) = map_blocks(&store, &blocks, &CoverageConfig::default()).unwrap();

    assert_eq!(summary.files_matched, 1);
    assert_eq!(summary.entities_mapped, 2);

    let login_row = rows.iter().find(|r| r.entity_id == login.id).unwrap();
    assert_eq!(login_row.coverage_percent, 100.0);
    assert_eq!(login_row.covered_lines.len(), 23);
    assert!(login_row.uncovered_lines.is_empty());

    let logout_row = rows.iter().find(|r| r.entity_id == logout.id).unwrap();
    assert_eq!(logout_row.coverage_percent, 0.0);
    // Lines 76..=80 have no data at all and are not counted.
    assert_eq!(logout_row.uncovered_lines, vec![70, 71, 72, 73, 74, 75]);
}

#[test]
fn covered_wins_over_uncovered_for_shared_lines() {
    let (_dir, store) = temp_store();
    let f = ranged_entity("f", "internal/x/f.go", 10, 12);
    store.bulk_insert_entities(&[f.clone()]).unwrap();

    let profile = "mode: count\n\
        mod/internal/x/f.go:10.1,12.9 3 0\n\
        mod/internal/x/f.go:11.1,11.9 1 7\n";
    let blocks = parse_profile_str(profile).unwrap();
    let (rows, _) = map_blocks(&store, &blocks, &CoverageConfig::default()).unwrap();

    let row = &rows[0];
    assert_eq!(row.covered_lines, vec![11]);
    assert_eq!(row.uncovered_lines, vec![10, 12]);
    assert!((row.coverage_percent - 100.0 / 3.0).abs() < 1e-9);

    // Disjointness and bounds invariants.
    assert!(row.covered_lines.iter().all(|l| !row.uncovered_lines.contains(l)));
    assert!((0.0..=100.0).contains(&row.coverage_percent));
}

#[test]
fn entities_without_line_end_are_skipped() {
    let (_dir, store) = temp_store();
    let mut open_ended = Entity::new("f", EntityType::Function, "internal/x/f.go", 10, "func f()");
    open_ended.line_end = None;
    store.bulk_insert_entities(&[open_ended]).unwrap();

    let profile = "mode: set\nmod/internal/x/f.go:10.1,20.2 5 1\n";
    let blocks = parse_profile_str(profile).unwrap();
    let (rows, summary) = map_blocks(&store, &blocks, &CoverageConfig::default()).unwrap();
    assert!(rows.is_empty());
    assert_eq!(summary.entities_mapped, 0);
}

#[test]
fn import_profile_persists_replace_on_write() {
    let (dir, store) = temp_store();
    let f = ranged_entity("f", "internal/x/f.go", 1, 4);
    store.bulk_insert_entities(&[f.clone()]).unwrap();

    let first = dir.path().join("cover1.out");
    std::fs::write(&first, "mode: set\nmod/internal/x/f.go:1.1,2.9 2 1\n").unwrap();
    import_profile(&store, &first, &CoverageConfig::default()).unwrap();
    assert_eq!(store.get_coverage(&f.id).unwrap().covered_lines, vec![1, 2]);

    let second = dir.path().join("cover2.out");
    std::fs::write(&second, "mode: set\nmod/internal/x/f.go:1.1,4.9 4 0\n").unwrap();
    import_profile(&store, &second, &CoverageConfig::default()).unwrap();

    let row = store.get_coverage(&f.id).unwrap();
    assert!(row.covered_lines.is_empty());
    assert_eq!(row.uncovered_lines, vec![1, 2, 3, 4]);
    assert_eq!(row.coverage_percent, 0.0);
}

#[test]
fn blocks_for_unknown_files_are_ignored() {
    let (_dir, store) = temp_store();
    let f = ranged_entity("f", "internal/x/f.go", 1, 4);
    store.bulk_insert_entities(&[f]).unwrap();

    let profile = "mode: set\nmod/internal/other/g.go:1.1,2.9 2 1\n";
    let blocks = parse_profile_str(profile).unwrap();
    let (rows, summary) = map_blocks(&store, &blocks, &CoverageConfig::default()).unwrap();
    assert!(rows.is_empty());
    assert_eq!(summary.files_matched, 0);
    assert_eq!(summary.blocks_total, 1);
}
