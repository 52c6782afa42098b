//! Gap/impact analyzer integration against a seeded store.

use chrono::Utc;
use tempfile::TempDir;

use cx_analysis::gaps::{analyze_gaps, impact_for_file, Priority};
use cx_core::config::MetricsConfig;
use cx_core::model::coverage::{EntityCoverage, TestEntityLink};
use cx_core::model::dependency::{DepType, Dependency};
use cx_core::model::entity::{Entity, EntityType};
use cx_core::model::metrics::EntityMetrics;
use cx_storage::Store;

fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (dir, store)
}

fn seed(
    store: &Store,
    name: &str,
    pagerank: f64,
    betweenness: f64,
    in_degree: i64,
    coverage: f64,
) -> Entity {
    let e = Entity::new(name, EntityType::Function, "src/app.go", 1, format!("func {name}()"));
    store.insert_entity(&e).unwrap();
    store
        .save_bulk_metrics(&[EntityMetrics {
            entity_id: e.id.clone(),
            pagerank,
            in_degree,
            out_degree: 0,
            betweenness,
            computed_at: Utc::now(),
        }])
        .unwrap();
    store
        .upsert_coverage(&EntityCoverage {
            entity_id: e.id.clone(),
            coverage_percent: coverage,
            covered_lines: Vec::new(),
            uncovered_lines: Vec::new(),
            last_run: Utc::now(),
        })
        .unwrap();
    e
}

/// Five entities spanning every tier, default thresholds.
#[test]
fn gap_priorities_and_risk_ordering() {
    let (_dir, store) = temp_store();
    let a = seed(&store, "a", 0.45, 0.15, 15, 15.0);
    let b = seed(&store, "b", 0.18, 0.35, 8, 22.0);
    let c = seed(&store, "c", 0.12, 0.08, 6, 20.0);
    let d = seed(&store, "d", 0.02, 0.0, 0, 40.0);
    let e = seed(&store, "e", 0.40, 0.10, 12, 95.0);

    let report = analyze_gaps(&store, &MetricsConfig::default(), 75.0, None, false).unwrap();

    assert_eq!(report.gaps.len(), 4);
    let priority_of = |id: &str| {
        report
            .gaps
            .iter()
            .find(|g| g.entity_id == id)
            .map(|g| g.priority)
    };
    assert_eq!(priority_of(&a.id), Some(Priority::Critical));
    assert_eq!(priority_of(&b.id), Some(Priority::High));
    assert_eq!(priority_of(&c.id), Some(Priority::Medium));
    assert_eq!(priority_of(&d.id), Some(Priority::Low));
    assert_eq!(priority_of(&e.id), None, "well-covered entity must not be reported");

    // Risk ordering a > b > c > d.
    let order: Vec<&str> = report.gaps.iter().map(|g| g.entity_id.as_str()).collect();
    assert_eq!(order, vec![&a.id, &b.id, &c.id, &d.id]);

    assert_eq!(report.summary.critical, 1);
    assert_eq!(report.summary.high, 1);
    assert_eq!(report.summary.medium, 1);
    assert_eq!(report.summary.low, 1);
    // a and e are keystones (>= 0.30); only a has a gap.
    assert_eq!(report.summary.total_keystones, 2);
    assert_eq!(report.summary.keystones_with_gaps, 1);
    assert!(report.summary.recommendation.contains("keystone"));
    assert!(report.by_priority.is_none());
}

#[test]
fn top_n_truncates_after_risk_sort() {
    let (_dir, store) = temp_store();
    let a = seed(&store, "a", 0.45, 0.15, 15, 15.0);
    seed(&store, "b", 0.18, 0.35, 8, 22.0);
    seed(&store, "c", 0.12, 0.08, 6, 20.0);

    let report = analyze_gaps(&store, &MetricsConfig::default(), 75.0, Some(1), false).unwrap();
    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.gaps[0].entity_id, a.id);
    // Counts stay canonical over the whole gap set.
    assert_eq!(
        report.summary.critical + report.summary.high + report.summary.medium,
        3
    );
}

#[test]
fn grouped_view_is_opt_in() {
    let (_dir, store) = temp_store();
    seed(&store, "a", 0.45, 0.15, 15, 15.0);
    seed(&store, "d", 0.02, 0.0, 0, 40.0);

    let report = analyze_gaps(&store, &MetricsConfig::default(), 75.0, None, true).unwrap();
    let grouped = report.by_priority.unwrap();
    assert_eq!(grouped.get("critical").map(|v| v.len()), Some(1));
    assert_eq!(grouped.get("low").map(|v| v.len()), Some(1));
}

#[test]
fn missing_coverage_rows_count_as_zero_percent() {
    let (_dir, store) = temp_store();
    let e = Entity::new("bare", EntityType::Function, "src/app.go", 1, "func bare()");
    store.insert_entity(&e).unwrap();
    store
        .save_bulk_metrics(&[EntityMetrics {
            entity_id: e.id.clone(),
            pagerank: 0.5,
            in_degree: 3,
            out_degree: 0,
            betweenness: 0.0,
            computed_at: Utc::now(),
        }])
        .unwrap();

    let report = analyze_gaps(&store, &MetricsConfig::default(), 75.0, None, false).unwrap();
    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.gaps[0].coverage_percent, 0.0);
    assert_eq!(report.gaps[0].priority, Priority::Critical);
    // risk = (1 - 0) * 0.5 * (3 + 1)
    assert_eq!(report.gaps[0].risk_score, 2.0);
}

#[test]
fn file_impact_joins_dependents_and_tests() {
    let (_dir, store) = temp_store();
    let core = seed(&store, "core", 0.50, 0.1, 4, 10.0);
    // A dependent in another file.
    let caller = Entity::new("caller", EntityType::Function, "src/api.go", 1, "func caller()");
    store.insert_entity(&caller).unwrap();
    store
        .insert_dependency(&Dependency::new(&caller.id, &core.id, DepType::Calls))
        .unwrap();
    store
        .replace_test_map(&[TestEntityLink {
            test_file: "TestCore_test.go".to_string(),
            test_name: "TestCore".to_string(),
            entity_id: core.id.clone(),
        }])
        .unwrap();

    let report = impact_for_file(&store, &MetricsConfig::default(), 75.0, "src/app.go").unwrap();
    let ids: Vec<&str> = report.entries.iter().map(|e| e.entity_id.as_str()).collect();
    assert!(ids.contains(&core.id.as_str()));
    assert!(ids.contains(&caller.id.as_str()));

    let core_entry = report
        .entries
        .iter()
        .find(|e| e.entity_id == core.id)
        .unwrap();
    assert_eq!(core_entry.covering_tests, vec!["TestCore".to_string()]);
    assert!(core_entry.is_keystone);
    assert_eq!(report.keystones_with_gaps, 1);
}
