//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`]. Column additions
//! check `PRAGMA table_info` first, because databases written by older builds
//! sometimes carry the column without the matching version bump.

use rusqlite::Connection;

use super::schema::column_exists;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        conn.execute_batch("BEGIN IMMEDIATE")?;
        let applied = match next {
            2 => migrate_v1_to_v2(conn),
            3 => migrate_v2_to_v3(conn),
            _ => {
                tracing::error!(version = next, "unknown migration target");
                conn.execute_batch("ROLLBACK")?;
                break;
            }
        }
        .and_then(|()| update_schema_version(conn, next));

        match applied {
            Ok(()) => conn.execute_batch("COMMIT")?,
            Err(e) => {
                conn.execute_batch("ROLLBACK")?;
                return Err(e);
            }
        }
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: access metadata on memories for the decay engine.
///
/// `last_accessed` is backfilled from `created_at` (as epoch seconds) and
/// `effective_importance` from `importance`.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    if !column_exists(conn, "memories", "last_accessed")? {
        conn.execute_batch("ALTER TABLE memories ADD COLUMN last_accessed REAL")?;
    }
    if !column_exists(conn, "memories", "effective_importance")? {
        conn.execute_batch("ALTER TABLE memories ADD COLUMN effective_importance REAL")?;
    }
    if !column_exists(conn, "memories", "access_count")? {
        conn.execute_batch(
            "ALTER TABLE memories ADD COLUMN access_count INTEGER NOT NULL DEFAULT 0",
        )?;
    }

    conn.execute_batch(
        "UPDATE memories
            SET last_accessed = (julianday(created_at) - 2440587.5) * 86400.0
          WHERE last_accessed IS NULL AND julianday(created_at) IS NOT NULL;
         UPDATE memories
            SET effective_importance = importance
          WHERE effective_importance IS NULL;
         CREATE INDEX IF NOT EXISTS idx_memories_effective_importance
             ON memories(effective_importance);",
    )
}

/// Migration v2 → v3: separate co-activation timestamp on edges for idle decay.
fn migrate_v2_to_v3(conn: &Connection) -> rusqlite::Result<()> {
    if !column_exists(conn, "edges", "last_coactivated")? {
        conn.execute_batch("ALTER TABLE edges ADD COLUMN last_coactivated REAL")?;
    }
    Ok(())
}
