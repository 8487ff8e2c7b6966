#![allow(dead_code)]

use rusqlite::params;
use std::sync::Arc;
use tempfile::TempDir;

use synaptic::augment::{NoConcepts, NoSimilarity};
use synaptic::config::SynapticConfig;
use synaptic::db::{DualStore, StoreLayout};
use synaptic::graph::catalog::{parse_catalog, seed, CatalogNode};
use synaptic::graph::nodes::lookup_node;
use synaptic::graph::types::now_epoch;
use synaptic::mind::{Mind, SaveRequest};

/// Small catalog: three engineering nodes, one emotion node, one work node.
pub const FIXTURE_CATALOG: &str = r#"{
  "nodes": [
    {"id": "architecture", "name": "Architecture", "category": "engineering",
     "keywords": ["architecture", "design"], "prototype_phrases": ["microservices architecture"]},
    {"id": "deployment", "name": "Deployment", "category": "engineering",
     "keywords": ["deployment", "release"], "prototype_phrases": ["independent deployment"]},
    {"id": "testing", "name": "Testing", "category": "engineering",
     "keywords": ["test", "coverage"], "prototype_phrases": ["integration test"]},
    {"id": "joy", "name": "Joy", "category": "emotion",
     "keywords": ["joy", "happy", "delight"], "prototype_phrases": []},
    {"id": "planning", "name": "Planning", "category": "work",
     "keywords": ["plan", "roadmap"], "prototype_phrases": ["quarterly roadmap"]}
  ]
}"#;

pub const SCENARIO_TEXT: &str = "Microservices architecture enables independent deployment of services";

pub fn fixture_nodes() -> Vec<CatalogNode> {
    parse_catalog(FIXTURE_CATALOG).unwrap()
}

/// Durable-only in-memory store seeded with the fixture catalog.
pub fn test_store() -> DualStore {
    let store = DualStore::open_in_memory().unwrap();
    seed(&store, &fixture_nodes(), 0.1).unwrap();
    store
}

/// A mind over a fresh in-memory store with default config.
pub fn test_mind() -> Mind {
    mind_with(test_store(), SynapticConfig::default())
}

pub fn mind_with(store: DualStore, config: SynapticConfig) -> Mind {
    Mind::with_parts(store, config, Arc::new(NoConcepts), Arc::new(NoSimilarity)).unwrap()
}

/// Config whose durable and fast databases live in `tmp`.
pub fn temp_config(tmp: &TempDir, fast: bool) -> SynapticConfig {
    let mut config = SynapticConfig::default();
    config.storage.db_path = tmp.path().join("disk").join("synaptic.db").display().to_string();
    config.storage.fast_enabled = fast;
    config.storage.fast_dir = Some(tmp.path().join("fast").display().to_string());
    config.storage.catalog_path = Some(tmp.path().join("no-such-catalog.json").display().to_string());
    config
}

pub fn temp_layout(tmp: &TempDir) -> StoreLayout {
    StoreLayout {
        durable: tmp.path().join("disk").join("synaptic.db"),
        fast: Some(tmp.path().join("fast").join("synaptic.db")),
    }
}

pub fn save(mind: &Mind, content: &str) -> String {
    mind.save(SaveRequest {
        content: content.into(),
        ..SaveRequest::default()
    })
    .unwrap()
    .memory_id
}

pub fn save_with_importance(mind: &Mind, content: &str, importance: f64) -> String {
    mind.save(SaveRequest {
        content: content.into(),
        importance: Some(importance),
        ..SaveRequest::default()
    })
    .unwrap()
    .memory_id
}

pub fn node_row(store: &DualStore, name: &str) -> i64 {
    store
        .read(|conn| lookup_node(conn, name))
        .unwrap()
        .unwrap_or_else(|| panic!("no node {name}"))
        .id
}

/// Pretend the memory was last accessed `days` ago.
pub fn age_memory(store: &DualStore, memory_id: &str, days: f64) {
    let then = now_epoch() - days * 86_400.0;
    store
        .write(
            "test aging",
            "UPDATE memories SET last_accessed = ?2 WHERE memory_id = ?1",
            params![memory_id, then],
        )
        .unwrap();
}

/// Pretend the edge was last strengthened `days` ago.
pub fn age_edge(store: &DualStore, source: i64, target: i64, days: f64) {
    let then = now_epoch() - days * 86_400.0;
    store
        .write(
            "test aging",
            "UPDATE edges SET last_strengthened = ?3, last_coactivated = ?3
              WHERE source_id = ?1 AND target_id = ?2",
            params![source.min(target), source.max(target), then],
        )
        .unwrap();
}

pub fn effective_importance(store: &DualStore, memory_id: &str) -> f64 {
    store
        .read(|conn| {
            Ok(conn.query_row(
                "SELECT effective_importance FROM memories WHERE memory_id = ?1",
                [memory_id],
                |r| r.get(0),
            )?)
        })
        .unwrap()
}
