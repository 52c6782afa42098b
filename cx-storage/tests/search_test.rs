//! FTS search integration: reindex, ranked retrieval, blending, boosts.

use chrono::Utc;
use tempfile::TempDir;

use cx_core::config::SearchConfig;
use cx_core::errors::StorageError;
use cx_core::model::entity::{Entity, EntityType};
use cx_core::model::metrics::EntityMetrics;
use cx_storage::Store;

fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (dir, store)
}

fn entity(name: &str, doc: &str, body: &str) -> Entity {
    let mut e = Entity::new(
        name,
        EntityType::Function,
        format!("src/{name}.go"),
        1,
        format!("func {name}()"),
    )
    .with_body(body);
    e.doc_comment = Some(doc.to_string());
    e
}

fn metrics(entity_id: &str, pagerank: f64) -> EntityMetrics {
    EntityMetrics {
        entity_id: entity_id.to_string(),
        pagerank,
        in_degree: 0,
        out_degree: 0,
        betweenness: 0.0,
        computed_at: Utc::now(),
    }
}

#[test]
fn search_orders_by_combined_score_nonincreasing() {
    let (_dir, store) = temp_store();
    let rate = entity("RateLimiter", "limits request rate", "rate limit tokens bucket");
    let parse = entity("ParseConfig", "parses configuration", "read yaml config");
    let misc = entity("Misc", "unrelated helper", "rate of change");
    store
        .bulk_insert_entities(&[rate.clone(), parse.clone(), misc.clone()])
        .unwrap();
    store.reindex_search().unwrap();

    let hits = store
        .search("rate limit", 10, &SearchConfig::default())
        .unwrap();
    assert!(!hits.is_empty());
    for pair in hits.windows(2) {
        assert!(pair[0].combined_score >= pair[1].combined_score);
    }
}

#[test]
fn pagerank_breaks_textual_ties() {
    let (_dir, store) = temp_store();
    let a = entity("HandlerA", "dispatch handler", "dispatch the event");
    let b = entity("HandlerB", "dispatch handler", "dispatch the event");
    store.bulk_insert_entities(&[a.clone(), b.clone()]).unwrap();
    store
        .save_bulk_metrics(&[metrics(&a.id, 0.05), metrics(&b.id, 0.40)])
        .unwrap();
    store.reindex_search().unwrap();

    let hits = store
        .search("dispatch", 10, &SearchConfig::default())
        .unwrap();
    assert_eq!(hits[0].entity_id, b.id);
    assert!(hits[0].pagerank > hits[1].pagerank);
}

#[test]
fn exact_name_match_is_boosted() {
    let (_dir, store) = temp_store();
    let named = entity("login", "no docs", "x");
    let wordy = entity(
        "SessionManager",
        "login login login everywhere",
        "login login login login",
    );
    store
        .bulk_insert_entities(&[named.clone(), wordy.clone()])
        .unwrap();
    store.reindex_search().unwrap();

    let hits = store.search("login", 10, &SearchConfig::default()).unwrap();
    assert_eq!(hits[0].entity_id, named.id);
}

#[test]
fn stopword_only_query_falls_back_to_first_token() {
    let (_dir, store) = temp_store();
    // "code" is a stopword, but the fallback keeps it as a prefix term.
    let code_gen = entity("codegen", "emits code", "generate code");
    store.bulk_insert_entities(&[code_gen.clone()]).unwrap();
    store.reindex_search().unwrap();

    let hits = store
        .search("code source file", 10, &SearchConfig::default())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity_id, code_gen.id);
}

#[test]
fn archived_entities_are_not_indexed() {
    let (_dir, store) = temp_store();
    let e = entity("ghost", "haunted", "boo");
    store.insert_entity(&e).unwrap();
    store.archive_entity(&e.id).unwrap();
    store.reindex_search().unwrap();

    let hits = store.search("ghost", 10, &SearchConfig::default()).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn reindex_is_idempotent() {
    let (_dir, store) = temp_store();
    store
        .bulk_insert_entities(&[entity("alpha", "first", "one")])
        .unwrap();
    assert_eq!(store.reindex_search().unwrap(), 1);
    assert_eq!(store.reindex_search().unwrap(), 1);
}

#[test]
fn empty_query_is_invalid_input() {
    let (_dir, store) = temp_store();
    let err = store
        .search("   ", 10, &SearchConfig::default())
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput { .. }));
}

#[test]
fn threshold_filters_low_scores() {
    let (_dir, store) = temp_store();
    let e = entity("weak", "barely mentions topic once", "topic");
    store.bulk_insert_entities(&[e]).unwrap();
    store.reindex_search().unwrap();

    let strict = SearchConfig {
        min_combined_score: 10.0,
        ..Default::default()
    };
    assert!(store.search("topic", 10, &strict).unwrap().is_empty());
}
