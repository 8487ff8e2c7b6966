pub mod bootstrap;
pub mod dual;
pub mod migrations;
pub mod schema;

pub use dual::{Backends, DualStore, DualWriteStatus, StoreLayout};

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open (or create) a graph database at the given path with schema and
/// migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;

    // WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    configure(&conn)?;

    schema::init_schema(&conn)?;
    migrations::run_migrations(&conn)?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an existing database without write access. Used to inspect a fast
/// mirror before deciding whether to reuse it.
pub fn open_read_only(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    schema::init_schema(&conn)?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

/// Row count of one of the fixed schema tables.
pub fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub node_count: i64,
    pub edge_count: i64,
    pub memory_count: i64,
    pub activation_count: i64,
}

/// Schema version, `PRAGMA integrity_check`, and per-table row counts.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let mut stmt = conn.prepare("PRAGMA integrity_check")?;
    let lines = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let integrity_ok = lines.len() == 1 && lines[0] == "ok";

    Ok(HealthReport {
        schema_version,
        integrity_ok,
        integrity_details: lines.join("; "),
        node_count: count_rows(conn, "nodes")?,
        edge_count: count_rows(conn, "edges")?,
        memory_count: count_rows(conn, "memories")?,
        activation_count: count_rows(conn, "memory_activations")?,
    })
}
