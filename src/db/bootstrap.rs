//! Startup reconciliation of the fast mirror with the durable store.
//!
//! The mirror is a file-level copy of the durable database. At startup:
//! - durable empty: any old mirror is discarded and both start fresh;
//! - mirror present, unmarked, and its content fingerprint matches: reused as is;
//! - otherwise: durable is checkpointed and copied over the mirror, together
//!   with its `-wal` file when one exists.
//!
//! A mirror that missed a write at runtime leaves a `.stale` marker next to
//! its database file, which forces the copy on the next start.

use rusqlite::types::Value;
use rusqlite::Connection;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{count_rows, open_read_only};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No fast backend in use.
    DurableOnly,
    /// Durable store was empty; the mirror starts empty alongside it.
    Fresh,
    /// Existing mirror matched the durable store.
    Reused,
    /// Mirror was rebuilt from the durable store.
    Copied,
}

/// `<db>.stale` beside the fast database.
pub fn stale_marker_path(fast_path: &Path) -> PathBuf {
    sibling(fast_path, ".stale")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Bring the mirror file at `fast_path` in line with the durable store.
/// Does not open the mirror; the caller does that afterwards.
pub fn prepare_fast(durable: &Connection, durable_path: &Path, fast_path: &Path) -> Result<BootstrapOutcome> {
    if let Some(parent) = fast_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let marker = stale_marker_path(fast_path);

    if count_rows(durable, "nodes")? == 0 {
        if fast_path.exists() {
            info!(path = %fast_path.display(), "durable store is empty, discarding old fast mirror");
            remove_db_files(fast_path)?;
        }
        remove_if_exists(&marker)?;
        return Ok(BootstrapOutcome::Fresh);
    }

    if fast_path.exists() && !marker.exists() && mirror_matches(durable, fast_path) {
        debug!(path = %fast_path.display(), "fast mirror is in sync");
        return Ok(BootstrapOutcome::Reused);
    }

    copy_durable(durable, durable_path, fast_path)?;
    remove_if_exists(&marker)?;
    Ok(BootstrapOutcome::Copied)
}

/// Per-table aggregates over every column a sweep, touch or strengthening
/// pass can change. Equal row counts alone miss in-place updates.
const FINGERPRINTS: [(&str, &str); 4] = [
    ("nodes", "SELECT COUNT(*), TOTAL(activation_count), MAX(last_activated) FROM nodes"),
    (
        "edges",
        "SELECT COUNT(*), TOTAL(weight), TOTAL(co_activation_count), \
         MAX(last_strengthened), MAX(last_coactivated) FROM edges",
    ),
    (
        "memories",
        "SELECT COUNT(*), TOTAL(effective_importance), TOTAL(access_count), \
         MAX(last_accessed) FROM memories",
    ),
    ("memory_activations", "SELECT COUNT(*), TOTAL(activation_score) FROM memory_activations"),
];

fn fingerprint(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<Value>> {
    conn.query_row(sql, [], |row| {
        (0..row.as_ref().column_count())
            .map(|i| row.get::<_, Value>(i))
            .collect()
    })
}

fn mirror_matches(durable: &Connection, fast_path: &Path) -> bool {
    let Ok(fast) = open_read_only(fast_path) else {
        return false;
    };
    FINGERPRINTS.iter().all(|(table, sql)| {
        match (fingerprint(durable, sql), fingerprint(&fast, sql)) {
            (Ok(d), Ok(f)) if d == f => true,
            (Ok(_), Ok(_)) => {
                debug!(table = *table, "fast mirror content differs from durable");
                false
            }
            _ => false,
        }
    })
}

/// Checkpoint the durable WAL into the main file, then copy the database and
/// any remaining WAL over the mirror.
fn copy_durable(durable: &Connection, durable_path: &Path, fast_path: &Path) -> Result<()> {
    durable.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;

    remove_db_files(fast_path)?;
    let bytes = std::fs::copy(durable_path, fast_path)?;

    let wal = sibling(durable_path, "-wal");
    if wal.exists() {
        std::fs::copy(&wal, sibling(fast_path, "-wal"))?;
    }

    info!(
        from = %durable_path.display(),
        to = %fast_path.display(),
        bytes,
        "copied durable store to fast mirror"
    );
    Ok(())
}

fn remove_db_files(path: &Path) -> Result<()> {
    remove_if_exists(path)?;
    remove_if_exists(&sibling(path, "-wal"))?;
    remove_if_exists(&sibling(path, "-shm"))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
