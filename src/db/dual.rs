//! Dual-backend persistence and the process-wide concurrency guard.
//!
//! A [`DualStore`] owns the durable connection (source of truth) and an
//! optional fast mirror connection behind one [`parking_lot::ReentrantMutex`].
//! Every mutation goes through [`Backends::write`]: durable first, then the
//! mirror. A durable failure is returned as [`MindError::DurableWrite`]; a
//! mirror failure becomes a [`MirrorWriteError`] that is logged, marks the
//! mirror stale for the rest of the process, and is never propagated.
//!
//! [`Backends::transaction`] groups writes into one unit of work on both
//! backends. It is reentrant: a transaction opened while another is active on
//! the same thread joins the outer one, so a save can call into the Hebbian
//! engine which opens its own transaction without committing early.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rusqlite::{Connection, ToSql};
use serde::Serialize;
use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::bootstrap::{self, BootstrapOutcome};
use crate::error::{MindError, MirrorWriteError, Result};

/// Where the two backends live on disk.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    pub durable: PathBuf,
    pub fast: Option<PathBuf>,
}

/// Snapshot of the dual-write configuration for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct DualWriteStatus {
    /// A fast backend was configured and opened.
    pub enabled: bool,
    /// The mirror missed a write and reads are served from the durable store.
    pub fast_stale: bool,
    pub durable_path: Option<String>,
    pub fast_path: Option<String>,
}

/// Both connections plus the per-process bookkeeping that the guard protects.
///
/// Only reachable through a [`DualStore`] lock guard, so the `Cell`s are never
/// touched by two threads at once.
pub struct Backends {
    durable: Connection,
    fast: Option<Connection>,
    fast_stale: Cell<bool>,
    fast_in_tx: Cell<bool>,
    tx_depth: Cell<u32>,
    layout: Option<StoreLayout>,
}

impl Backends {
    /// The source-of-truth connection. Write paths read from here.
    pub fn durable(&self) -> &Connection {
        &self.durable
    }

    /// The mirror connection, if one was opened (stale or not).
    pub fn fast(&self) -> Option<&Connection> {
        self.fast.as_ref()
    }

    /// Connection for read-only queries: the mirror while it is in sync,
    /// otherwise the durable store.
    pub fn reader(&self) -> &Connection {
        self.live_fast().unwrap_or(&self.durable)
    }

    pub fn is_fast_stale(&self) -> bool {
        self.fast_stale.get()
    }

    fn live_fast(&self) -> Option<&Connection> {
        if self.fast_stale.get() {
            None
        } else {
            self.fast.as_ref()
        }
    }

    /// Execute one mutating statement on the durable backend, then mirror it.
    ///
    /// `entity` names what is being written and is carried into the error.
    pub fn write(&self, entity: &str, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        let changed = self
            .durable
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.execute(params))
            .map_err(|e| MindError::durable(entity, e))?;

        if let Err(e) = self.mirror(entity, sql, params) {
            self.mark_stale(&e);
        }
        Ok(changed)
    }

    fn mirror(&self, entity: &str, sql: &str, params: &[&dyn ToSql]) -> Result<(), MirrorWriteError> {
        let Some(fast) = self.live_fast() else {
            return Ok(());
        };
        fast.prepare_cached(sql)
            .and_then(|mut stmt| stmt.execute(params))
            .map(|_| ())
            .map_err(|source| MirrorWriteError {
                entity: entity.to_string(),
                source,
            })
    }

    fn mark_stale(&self, err: &MirrorWriteError) {
        warn!(entity = %err.entity, error = %err.source, "fast mirror write failed, serving reads from durable store");
        if self.fast_stale.replace(true) {
            return;
        }
        let Some(fast_path) = self.layout.as_ref().and_then(|l| l.fast.as_ref()) else {
            return;
        };
        let marker = bootstrap::stale_marker_path(fast_path);
        if let Err(e) = std::fs::write(&marker, b"stale\n") {
            warn!(marker = %marker.display(), error = %e, "could not write stale marker");
        }
    }

    /// Run `f` as a single unit of work on both backends.
    ///
    /// Durable commits first; the mirror commits only if it saw every write.
    /// Any error from `f` or from the durable commit rolls back both.
    pub fn transaction<T>(&self, label: &str, f: impl FnOnce(&Backends) -> Result<T>) -> Result<T> {
        let depth = self.tx_depth.get();
        if depth > 0 {
            self.tx_depth.set(depth + 1);
            let result = f(self);
            self.tx_depth.set(depth);
            return result;
        }

        self.durable
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| MindError::durable(label, e))?;
        if let Some(fast) = self.live_fast() {
            match fast.execute_batch("BEGIN IMMEDIATE") {
                Ok(()) => self.fast_in_tx.set(true),
                Err(source) => self.mark_stale(&MirrorWriteError {
                    entity: label.to_string(),
                    source,
                }),
            }
        }

        self.tx_depth.set(1);
        let result = f(self);
        self.tx_depth.set(0);

        match result {
            Ok(value) => {
                self.commit(label)?;
                Ok(value)
            }
            Err(e) => {
                debug!(label, error = %e, "rolling back");
                self.rollback();
                Err(e)
            }
        }
    }

    fn commit(&self, label: &str) -> Result<()> {
        if let Err(e) = self.durable.execute_batch("COMMIT") {
            self.rollback();
            return Err(MindError::durable(label, e));
        }

        if !self.fast_in_tx.replace(false) {
            return Ok(());
        }
        let Some(fast) = &self.fast else {
            return Ok(());
        };
        if self.fast_stale.get() {
            // Partial mirror work from a failed statement must not land.
            if let Err(e) = fast.execute_batch("ROLLBACK") {
                warn!(label, error = %e, "fast mirror rollback failed");
            }
        } else if let Err(source) = fast.execute_batch("COMMIT") {
            self.mark_stale(&MirrorWriteError {
                entity: label.to_string(),
                source,
            });
            if !fast.is_autocommit() {
                let _ = fast.execute_batch("ROLLBACK");
            }
        }
        Ok(())
    }

    fn rollback(&self) {
        if !self.durable.is_autocommit() {
            if let Err(e) = self.durable.execute_batch("ROLLBACK") {
                warn!(error = %e, "durable rollback failed");
            }
        }
        if self.fast_in_tx.replace(false) {
            if let Some(fast) = self.fast.as_ref().filter(|f| !f.is_autocommit()) {
                if let Err(e) = fast.execute_batch("ROLLBACK") {
                    warn!(error = %e, "fast mirror rollback failed");
                }
            }
        }
    }
}

/// Shared handle to both backends and the guard. Cheap to clone.
#[derive(Clone)]
pub struct DualStore {
    inner: Arc<ReentrantMutex<Backends>>,
}

impl DualStore {
    /// Open the durable database, reconcile and open the fast mirror if one is
    /// configured. A mirror that cannot be prepared is logged and skipped.
    pub fn open(layout: StoreLayout) -> Result<(Self, BootstrapOutcome)> {
        let durable = super::open_database(&layout.durable)?;

        let mut outcome = BootstrapOutcome::DurableOnly;
        let mut fast = None;
        if let Some(fast_path) = layout.fast.as_ref() {
            if fast_path == &layout.durable {
                warn!(path = %fast_path.display(), "fast backend path equals durable path, ignoring");
            } else {
                let prepared = bootstrap::prepare_fast(&durable, &layout.durable, fast_path)
                    .and_then(|o| Ok((super::open_database(fast_path)?, o)));
                match prepared {
                    Ok((conn, o)) => {
                        fast = Some(conn);
                        outcome = o;
                    }
                    Err(e) => warn!(
                        path = %fast_path.display(),
                        error = %e,
                        "fast backend unavailable, continuing with durable store only"
                    ),
                }
            }
        }

        info!(
            durable = %layout.durable.display(),
            fast = fast.is_some(),
            bootstrap = ?outcome,
            "storage ready"
        );
        Ok((Self::from_parts(durable, fast, Some(layout)), outcome))
    }

    /// Durable-only store backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_parts(super::open_memory_database()?, None, None))
    }

    /// Wrap already-initialized connections. The caller is responsible for
    /// schema setup and for the two holding identical data.
    pub fn from_connections(durable: Connection, fast: Option<Connection>) -> Self {
        Self::from_parts(durable, fast, None)
    }

    fn from_parts(durable: Connection, fast: Option<Connection>, layout: Option<StoreLayout>) -> Self {
        let backends = Backends {
            durable,
            fast,
            fast_stale: Cell::new(false),
            fast_in_tx: Cell::new(false),
            tx_depth: Cell::new(0),
            layout,
        };
        Self {
            inner: Arc::new(ReentrantMutex::new(backends)),
        }
    }

    /// Acquire the guard. Reentrant on the same thread.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, Backends> {
        self.inner.lock()
    }

    pub fn transaction<T>(&self, label: &str, f: impl FnOnce(&Backends) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        guard.transaction(label, f)
    }

    pub fn write(&self, entity: &str, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        self.lock().write(entity, sql, params)
    }

    /// Run a read under the guard against the current read connection.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        f(guard.reader())
    }

    pub fn status(&self) -> DualWriteStatus {
        let guard = self.lock();
        let layout = guard.layout.as_ref();
        DualWriteStatus {
            enabled: guard.fast.is_some(),
            fast_stale: guard.is_fast_stale(),
            durable_path: layout.map(|l| l.durable.display().to_string()),
            fast_path: layout
                .and_then(|l| l.fast.as_ref())
                .map(|p| p.display().to_string()),
        }
    }
}
