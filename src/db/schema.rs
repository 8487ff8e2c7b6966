//! SQL DDL for the concept graph.
//!
//! Defines the `nodes`, `edges`, `memories`, `memory_activations`, and
//! `schema_meta` tables at schema version 1. Columns added later
//! (access metadata on memories, `last_coactivated` on edges) are introduced by
//! [`super::migrations`], so a fresh database and an upgraded legacy database
//! end up structurally identical. All DDL uses `IF NOT EXISTS`.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Concepts, seeded from the catalog and never deleted
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT,
    keywords TEXT NOT NULL DEFAULT '[]',
    prototype_phrases TEXT NOT NULL DEFAULT '[]',
    weight REAL NOT NULL DEFAULT 1.0,
    activation_count INTEGER NOT NULL DEFAULT 0,
    last_activated TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name);
CREATE INDEX IF NOT EXISTS idx_nodes_category ON nodes(category);

-- Undirected weighted connections, stored with source_id < target_id
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES nodes(id),
    target_id INTEGER NOT NULL REFERENCES nodes(id),
    weight REAL NOT NULL DEFAULT 0.1,
    co_activation_count INTEGER NOT NULL DEFAULT 0,
    last_strengthened REAL,
    created_at TEXT NOT NULL,
    UNIQUE(source_id, target_id),
    CHECK(source_id < target_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_weight ON edges(weight);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);

-- Memory content is immutable once written
CREATE TABLE IF NOT EXISTS memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memory_id TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    summary TEXT,
    source TEXT NOT NULL,
    importance REAL NOT NULL DEFAULT 0.5 CHECK(importance >= 0.0 AND importance <= 1.0),
    emotional_intensity REAL NOT NULL DEFAULT 0.5
        CHECK(emotional_intensity >= 0.0 AND emotional_intensity <= 1.0),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_source ON memories(source);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

-- Which nodes a memory activated, and how strongly
CREATE TABLE IF NOT EXISTS memory_activations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memory_id INTEGER NOT NULL REFERENCES memories(id),
    node_id INTEGER NOT NULL REFERENCES nodes(id),
    activation_score REAL NOT NULL CHECK(activation_score > 0.0 AND activation_score <= 1.0),
    UNIQUE(memory_id, node_id)
);

CREATE INDEX IF NOT EXISTS idx_activations_node ON memory_activations(node_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Tables that must hold identical rows in the durable and fast backends.
pub const DATA_TABLES: [&str; 4] = ["nodes", "edges", "memories", "memory_activations"];

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

/// Whether `table` has a column named `column`.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|n| n.eq_ignore_ascii_case(column)))
}
