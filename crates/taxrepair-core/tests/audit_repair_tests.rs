//! Integration tests for audit and repair against a real SQLite database.
//!
//! Rows are seeded through a second connection, the way a host application
//! would write to the same tables.

use rusqlite::Connection;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taxrepair_core::{
    AuditConfig, AuditEngine, CommandRouter, FileTaxonomyProvider, RepairError, RepairExecutor,
    SqliteStoreConfig, SqliteTaxonomyStore, StaticTaxonomyProvider, TaxonomyStore,
};
use tempfile::TempDir;

struct TestEnv {
    _temp_dir: TempDir,
    db_path: PathBuf,
    store: SqliteTaxonomyStore,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("site.sqlite");
        let store = SqliteTaxonomyStore::create(&db_path, SqliteStoreConfig::default())
            .expect("Failed to create store");
        Self {
            _temp_dir: temp_dir,
            db_path,
            store,
        }
    }

    /// Write rows the way the host would, outside the store.
    fn host_exec(&self, sql: &str) {
        let conn = Connection::open(&self.db_path).unwrap();
        conn.execute_batch(sql).unwrap();
    }
}

fn providers() -> StaticTaxonomyProvider {
    StaticTaxonomyProvider::new(["category", "post_tag"])
}

/// Host-owned tables with the looser column constraints older installs carry.
const LEGACY_HOST_SCHEMA: &str = "
    CREATE TABLE wp_terms (term_id INTEGER PRIMARY KEY, name TEXT, slug TEXT);
    CREATE TABLE wp_term_taxonomy (
        term_taxonomy_id INTEGER PRIMARY KEY,
        term_id INTEGER,
        taxonomy TEXT,
        parent INTEGER,
        count INTEGER
    );
    CREATE TABLE wp_term_relationships (object_id INTEGER, term_taxonomy_id INTEGER);";

/// Lay out a database the way the host would, without the store's help.
fn host_database(temp_dir: &TempDir, sql: &str) -> PathBuf {
    let db_path = temp_dir.path().join("host.sqlite");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(LEGACY_HOST_SCHEMA).unwrap();
    conn.execute_batch(sql).unwrap();
    db_path
}

fn journal_mode(db_path: &Path) -> String {
    Connection::open(db_path)
        .unwrap()
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_scenario_orphan_term_only() {
    let env = TestEnv::new();
    env.host_exec("INSERT INTO wp_terms (term_id, name, slug) VALUES (1, 'News', 'news');");

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();

    let ids: Vec<_> = report.orphan_terms.iter().map(|t| t.term_id).collect();
    assert_eq!(ids, vec![1]);
    let summary = report.summary();
    assert_eq!(summary.total(), 1);
    assert_eq!(summary.orphan_terms, 1);
}

#[test]
fn test_scenario_incorrect_count_then_fix() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_terms (term_id, name, slug) VALUES (1, 'News', 'news');
         INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy, parent, count)
             VALUES (10, 1, 'category', 0, 5);",
    );

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();
    assert_eq!(report.incorrect_counts.len(), 1);
    let entry = &report.incorrect_counts[0];
    assert_eq!(entry.term_taxonomy_id(), 10);
    assert_eq!((entry.stored, entry.real), (5, 0));

    let correction = RepairExecutor::new(&env.store).fix_count(10).unwrap();
    assert_eq!((correction.old, correction.new), (5, 0));

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_scenario_unregistered_taxonomy() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_terms (term_id, name, slug) VALUES (2, 'Old', 'old');
         INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy, parent, count)
             VALUES (20, 2, 'legacy_type', 0, 0);",
    );

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();
    let ids: Vec<_> = report
        .unregistered_taxonomies
        .iter()
        .map(|tt| tt.term_taxonomy_id)
        .collect();
    assert_eq!(ids, vec![20]);
}

#[test]
fn test_orphan_and_ghost_detection_is_complete() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_terms (term_id, name, slug) VALUES (1, 'A', 'a'), (2, 'B', 'b'), (3, 'C', 'c');
         INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy, count)
             VALUES (10, 1, 'category', 1), (11, 3, 'post_tag', 1), (12, 9, 'category', 0);
         INSERT INTO wp_term_relationships (object_id, term_taxonomy_id)
             VALUES (100, 10), (101, 11), (102, 50), (103, 51);",
    );

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();

    let orphans: Vec<_> = report.orphan_terms.iter().map(|t| t.term_id).collect();
    assert_eq!(orphans, vec![2]);
    let orphan_tt: Vec<_> = report
        .orphan_term_taxonomies
        .iter()
        .map(|tt| tt.term_taxonomy_id)
        .collect();
    assert_eq!(orphan_tt, vec![12]);
    let ghosts: Vec<_> = report
        .ghost_relationships
        .iter()
        .map(|r| r.object_id)
        .collect();
    assert_eq!(ghosts, vec![102, 103]);
}

#[test]
fn test_duplicate_grouping() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_terms (term_id, name, slug)
             VALUES (1, 'Red', 'red'), (2, 'Red', 'red-2'), (3, 'Blue', 'blue');",
    );

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();

    assert_eq!(report.duplicate_names.len(), 1);
    assert_eq!(report.duplicate_names[0].key, "Red");
    assert_eq!(report.duplicate_names[0].term_ids(), vec![1, 2]);
    assert!(report.duplicate_slugs.is_empty());
}

#[test]
fn test_fix_count_is_idempotent() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy, count)
             VALUES (10, 1, 'category', 0);
         INSERT INTO wp_term_relationships (object_id, term_taxonomy_id)
             VALUES (1, 10), (2, 10), (3, 10);",
    );
    let executor = RepairExecutor::new(&env.store);

    let first = executor.fix_count(10).unwrap();
    assert_eq!((first.old, first.new), (0, 3));
    assert_eq!(env.store.count_relationships(10).unwrap(), 3);

    let second = executor.fix_count(10).unwrap();
    assert_eq!((second.old, second.new), (3, 3));
    assert!(!second.changed());
}

#[test]
fn test_ghost_sweep_is_idempotent() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy) VALUES (10, 1, 'category');
         INSERT INTO wp_term_relationships (object_id, term_taxonomy_id)
             VALUES (1, 10), (2, 77), (3, 78);",
    );
    let executor = RepairExecutor::new(&env.store);

    assert_eq!(executor.delete_ghost_relationships().unwrap().deleted, 2);
    let after_first = env.store.fetch_relationships().unwrap();

    assert_eq!(executor.delete_ghost_relationships().unwrap().deleted, 0);
    assert_eq!(env.store.fetch_relationships().unwrap(), after_first);
}

#[test]
fn test_delete_orphan_rechecks_live_state() {
    let env = TestEnv::new();
    env.host_exec("INSERT INTO wp_terms (term_id, name, slug) VALUES (5, 'Draft', 'draft');");

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();
    assert_eq!(report.orphan_terms.len(), 1);

    // The host attaches the term to a taxonomy after the report was shown.
    env.host_exec(
        "INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy) VALUES (30, 5, 'category');",
    );

    let result = RepairExecutor::new(&env.store).delete_orphan_term(5);
    assert!(matches!(result, Err(RepairError::PreconditionFailed { .. })));
    assert_eq!(env.store.fetch_terms().unwrap().len(), 1);
}

#[test]
fn test_delete_orphan_twice_reports_not_found() {
    let env = TestEnv::new();
    env.host_exec("INSERT INTO wp_terms (term_id, name, slug) VALUES (5, 'Draft', 'draft');");
    let executor = RepairExecutor::new(&env.store);

    executor.delete_orphan_term(5).unwrap();
    let err = executor.delete_orphan_term(5).unwrap_err();
    assert!(err.is_benign());
}

#[test]
fn test_missing_tables_fail_with_integrity_read() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("empty.sqlite");
    Connection::open(&db_path)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (id INTEGER);")
        .unwrap();

    let store = SqliteTaxonomyStore::open(&db_path, SqliteStoreConfig::default()).unwrap();
    let result = AuditEngine::new(&store, &providers()).run();
    assert!(matches!(result, Err(RepairError::IntegrityRead { .. })));
}

#[test]
fn test_missing_taxonomy_list_fails_with_configuration() {
    let env = TestEnv::new();
    let provider = FileTaxonomyProvider::new(env.db_path.with_file_name("taxonomies.json"));

    let result = AuditEngine::new(&env.store, &provider).run();
    assert!(matches!(result, Err(RepairError::Configuration { .. })));
}

#[test]
fn test_snapshot_counts_match_live_counts() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_terms (term_id, name, slug) VALUES (1, 'A', 'a');
         INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy, count)
             VALUES (10, 1, 'category', 4);
         INSERT INTO wp_term_relationships (object_id, term_taxonomy_id) VALUES (1, 10);",
    );

    let live = AuditEngine::new(&env.store, &providers()).run().unwrap();
    let cached = AuditEngine::with_config(
        &env.store,
        &providers(),
        AuditConfig {
            recount_from_store: false,
        },
    )
    .run()
    .unwrap();

    assert_eq!(live.incorrect_counts, cached.incorrect_counts);
    assert_eq!(cached.incorrect_counts[0].real, 1);
}

#[test]
fn test_router_round_trip() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_terms (term_id, name, slug) VALUES (1, 'News', 'news'), (2, 'Lost', 'lost');
         INSERT INTO wp_term_taxonomy (term_taxonomy_id, term_id, taxonomy, count)
             VALUES (10, 1, 'category', 9);
         INSERT INTO wp_term_relationships (object_id, term_taxonomy_id) VALUES (1, 10), (2, 44);",
    );
    let store = SqliteTaxonomyStore::open(&env.db_path, SqliteStoreConfig::default()).unwrap();
    let router = CommandRouter::new(Arc::new(store), Arc::new(providers()));

    let audit = router.execute("run_audit", &json!({})).unwrap();
    assert_eq!(audit["status"], "audited");
    assert_eq!(audit["summary"]["orphanTerms"], 1);
    assert_eq!(audit["summary"]["ghostRelationships"], 1);
    assert_eq!(audit["summary"]["incorrectCounts"], 1);

    let deleted = router
        .execute("delete_orphan_term", &json!({"term_id": 2}))
        .unwrap();
    assert_eq!(deleted["status"], "term_deleted");

    let again = router
        .execute("delete_orphan_term", &json!({"term_id": 2}))
        .unwrap();
    assert_eq!(again["status"], "not_found");

    let swept = router
        .execute("delete_ghost_relationships", &json!({}))
        .unwrap();
    assert_eq!(swept["deleted"], 1);

    let fixed = router.execute("fix_count", &json!({"ttId": 10})).unwrap();
    assert_eq!(fixed["old"], 9);
    assert_eq!(fixed["new"], 1);

    let audit = router.execute("run_audit", &json!({})).unwrap();
    assert_eq!(audit["summary"]["orphanTerms"], 0);
    assert_eq!(audit["summary"]["ghostRelationships"], 0);
    assert_eq!(audit["summary"]["incorrectCounts"], 0);
}

#[test]
fn test_custom_table_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("multisite.sqlite");
    let store =
        SqliteTaxonomyStore::create(&db_path, SqliteStoreConfig::with_prefix("wp_2_")).unwrap();
    Connection::open(&db_path)
        .unwrap()
        .execute_batch("INSERT INTO wp_2_terms (term_id, name, slug) VALUES (1, 'Solo', 'solo');")
        .unwrap();

    let report = AuditEngine::new(&store, &providers()).run().unwrap();
    assert_eq!(report.orphan_terms.len(), 1);
}

#[test]
fn test_null_parent_is_a_root() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = host_database(
        &temp_dir,
        "INSERT INTO wp_terms (term_id, name, slug) VALUES (1, 'News', 'news');
         INSERT INTO wp_term_taxonomy VALUES (10, 1, 'category', NULL, 0);",
    );
    let store = SqliteTaxonomyStore::open(&db_path, SqliteStoreConfig::default()).unwrap();

    let report = AuditEngine::new(&store, &providers()).run().unwrap();
    assert!(report.broken_parents.is_empty());
    assert!(report.is_clean());

    let rows = store.fetch_term_taxonomies().unwrap();
    assert_eq!(rows[0].parent, 0);
    assert!(!rows[0].has_parent());
}

#[test]
fn test_open_keeps_host_journal_mode() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = host_database(
        &temp_dir,
        "INSERT INTO wp_terms (term_id, name, slug) VALUES (1, 'News', 'news');
         INSERT INTO wp_term_taxonomy VALUES (10, 1, 'category', 0, 3);",
    );
    let before = journal_mode(&db_path);
    assert_ne!(before, "wal");

    let store = SqliteTaxonomyStore::open(&db_path, SqliteStoreConfig::default()).unwrap();
    let report = AuditEngine::new(&store, &providers()).run().unwrap();
    assert_eq!(report.incorrect_counts.len(), 1);
    RepairExecutor::new(&store).fix_count(10).unwrap();
    drop(store);

    assert_eq!(journal_mode(&db_path), before);
}

#[test]
fn test_invalid_utf8_names_are_grouped_byte_exact() {
    let env = TestEnv::new();
    env.host_exec(
        "INSERT INTO wp_terms (term_id, name, slug) VALUES
             (1, CAST(x'43616ff9' AS TEXT), 'cao-1'),
             (2, CAST(x'43616ff9' AS TEXT), 'cao-2'),
             (3, CAST(x'43616ffa' AS TEXT), 'cao-3');",
    );

    let report = AuditEngine::new(&env.store, &providers()).run().unwrap();

    assert_eq!(report.orphan_terms.len(), 3);
    assert_eq!(report.duplicate_names.len(), 1);
    assert_eq!(report.duplicate_names[0].term_ids(), vec![1, 2]);
    assert_eq!(
        report.duplicate_names[0].key.as_bytes(),
        &[0x43, 0x61, 0x6f, 0xf9]
    );

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["duplicateNames"][0]["key"], "Cao\u{FFFD}");
}
