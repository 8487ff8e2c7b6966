mod helpers;

use rusqlite::types::Value;
use rusqlite::Connection;
use std::sync::Arc;
use tempfile::TempDir;

use synaptic::db::bootstrap::{stale_marker_path, BootstrapOutcome};
use synaptic::db::{count_rows, DualStore};
use synaptic::error::MindError;
use synaptic::graph::types::Activation;
use synaptic::graph::{GraphStore, HebbianEngine, HebbianParams, NewMemory};
use synaptic::mind::Mind;

fn dump(conn: &Connection, table: &str) -> Vec<Vec<Value>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {table} ORDER BY id")).unwrap();
    let columns = stmt.column_count();
    let rows = stmt
        .query_map([], |row| (0..columns).map(|i| row.get::<_, Value>(i)).collect())
        .unwrap()
        .collect::<rusqlite::Result<Vec<Vec<Value>>>>()
        .unwrap();
    rows
}

fn assert_backends_identical(store: &DualStore) {
    let guard = store.lock();
    let fast = guard.fast().expect("fast backend open");
    for table in ["nodes", "edges", "memories", "memory_activations"] {
        assert_eq!(dump(guard.durable(), table), dump(fast, table), "{table} differs");
    }
}

/// First session: seed, save a few memories, close.
fn populate(tmp: &TempDir) -> Vec<String> {
    let mind = Mind::open(helpers::temp_config(tmp, true)).unwrap();
    assert!(mind.status().unwrap().dual_write.enabled);
    let ids = vec![
        helpers::save(&mind, helpers::SCENARIO_TEXT),
        helpers::save(&mind, "So happy with the roadmap plan for next quarter"),
        helpers::save(&mind, "Integration test coverage for the new release"),
    ];
    assert_backends_identical(mind.store());
    ids
}

#[test]
fn writes_reach_both_backends() {
    let tmp = TempDir::new().unwrap();
    populate(&tmp);
}

#[test]
fn bootstrap_copy_preserves_rows_exactly() {
    let tmp = TempDir::new().unwrap();
    let layout = helpers::temp_layout(&tmp);
    populate(&tmp);

    let fast = layout.fast.clone().unwrap();
    std::fs::remove_file(&fast).unwrap();
    let _ = std::fs::remove_file(fast.with_extension("db-wal"));
    let _ = std::fs::remove_file(fast.with_extension("db-shm"));

    let (store, outcome) = DualStore::open(layout).unwrap();
    assert_eq!(outcome, BootstrapOutcome::Copied);
    assert_backends_identical(&store);
    assert_eq!(count_rows(store.lock().durable(), "memories").unwrap(), 3);
}

#[test]
fn matching_mirror_is_reused() {
    let tmp = TempDir::new().unwrap();
    populate(&tmp);

    let (store, outcome) = DualStore::open(helpers::temp_layout(&tmp)).unwrap();
    assert_eq!(outcome, BootstrapOutcome::Reused);
    assert_backends_identical(&store);
}

#[test]
fn stale_marker_forces_recopy() {
    let tmp = TempDir::new().unwrap();
    let layout = helpers::temp_layout(&tmp);
    populate(&tmp);

    let marker = stale_marker_path(layout.fast.as_ref().unwrap());
    std::fs::write(&marker, b"").unwrap();

    let (store, outcome) = DualStore::open(layout).unwrap();
    assert_eq!(outcome, BootstrapOutcome::Copied);
    assert!(!marker.exists());
    assert!(!store.status().fast_stale);
}

#[test]
fn diverged_mirror_is_rebuilt() {
    let tmp = TempDir::new().unwrap();
    let layout = helpers::temp_layout(&tmp);
    populate(&tmp);

    {
        let fast = Connection::open(layout.fast.as_ref().unwrap()).unwrap();
        fast.execute("DELETE FROM memory_activations", []).unwrap();
    }

    let (store, outcome) = DualStore::open(layout).unwrap();
    assert_eq!(outcome, BootstrapOutcome::Copied);
    assert_backends_identical(&store);
}

#[test]
fn durable_only_weight_change_is_not_masked_by_mirror() {
    let tmp = TempDir::new().unwrap();
    let layout = helpers::temp_layout(&tmp);
    populate(&tmp);

    // a committed durable update whose mirror write never landed
    {
        let durable = Connection::open(&layout.durable).unwrap();
        durable.execute("UPDATE edges SET weight = 7.5", []).unwrap();
    }

    let (store, outcome) = DualStore::open(layout).unwrap();
    assert_eq!(outcome, BootstrapOutcome::Copied);
    let served: f64 = store
        .read(|conn| Ok(conn.query_row("SELECT MAX(weight) FROM edges", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(served, 7.5);
    assert_backends_identical(&store);
}

#[test]
fn data_survives_restart_without_mirror() {
    let tmp = TempDir::new().unwrap();
    let ids = populate(&tmp);

    let mind = Mind::open(helpers::temp_config(&tmp, false)).unwrap();
    let status = mind.status().unwrap();
    assert!(!status.dual_write.enabled);
    assert_eq!(status.graph.memory_count, 3);
    // catalog is not re-seeded on an existing database
    assert_eq!(status.graph.node_count, 22);

    let result = mind
        .query(synaptic::mind::QueryRequest {
            node_names: vec!["Architecture".into()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.memories[0].memory_id, ids[0]);
}

#[test]
fn failed_save_rolls_back_both_backends() {
    let durable = synaptic::db::open_memory_database().unwrap();
    let fast = synaptic::db::open_memory_database().unwrap();
    let store = DualStore::from_connections(durable, Some(fast));
    synaptic::graph::catalog::seed(&store, &helpers::fixture_nodes(), 0.1).unwrap();

    let hebbian = Arc::new(HebbianEngine::new(store.clone(), HebbianParams::default()));
    let graph = GraphStore::new(store.clone(), hebbian, 100);
    let arch = helpers::node_row(&store, "Architecture");

    let activation = |node_row: i64, name: &str| Activation {
        node_row,
        node_id: name.to_lowercase(),
        name: name.into(),
        category: "engineering".into(),
        score: 0.6,
        matched_terms: vec![],
        concept_boosted: false,
    };
    let memory = NewMemory {
        content: "doomed".into(),
        summary: None,
        source: "test".into(),
        importance: 0.5,
        emotional_intensity: 0.5,
    };

    let err = graph
        .save(&memory, &[activation(arch, "Architecture"), activation(9_999, "Ghost")])
        .unwrap_err();
    assert!(matches!(err, MindError::DurableWrite { .. }), "got {err:?}");

    let guard = store.lock();
    for conn in [guard.durable(), guard.fast().unwrap()] {
        assert_eq!(count_rows(conn, "memories").unwrap(), 0);
        assert_eq!(count_rows(conn, "memory_activations").unwrap(), 0);
        let bumped: i64 = conn
            .query_row("SELECT activation_count FROM nodes WHERE id = ?1", [arch], |r| r.get(0))
            .unwrap();
        assert_eq!(bumped, 0);
    }
    assert!(!guard.is_fast_stale());
}
