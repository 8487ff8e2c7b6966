//! The memory save path.
//!
//! [`GraphStore::save`] runs as one unit of work on both backends: insert the
//! memory, one activation row and counter bump per activated node, then
//! pairwise strengthening and the periodic Hebbian maintenance. Any durable
//! failure leaves no trace of the memory.

use rusqlite::params;
use std::sync::Arc;
use tracing::info;

use super::hebbian::HebbianEngine;
use super::nodes;
use super::types::{new_memory_id, now_epoch, now_rfc3339, Activation};
use crate::db::DualStore;
use crate::error::Result;

/// Fields of a memory that the caller supplies. Already validated.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: String,
    pub summary: Option<String>,
    pub source: String,
    pub importance: f64,
    pub emotional_intensity: f64,
}

/// Owner of nodes, edges, memories and activation links.
#[derive(Clone)]
pub struct GraphStore {
    pub(crate) store: DualStore,
    pub(crate) hebbian: Arc<HebbianEngine>,
    pub(crate) node_list_limit: usize,
}

impl GraphStore {
    pub fn new(store: DualStore, hebbian: Arc<HebbianEngine>, node_list_limit: usize) -> Self {
        Self {
            store,
            hebbian,
            node_list_limit,
        }
    }

    pub fn hebbian(&self) -> &HebbianEngine {
        &self.hebbian
    }

    /// Persist a memory and its activations and strengthen the co-activated
    /// edges. Returns the new external memory id.
    pub fn save(&self, memory: &NewMemory, activations: &[Activation]) -> Result<String> {
        let memory_id = new_memory_id();
        let label = format!("memory {memory_id}");

        self.store.transaction(&label, |b| {
            let now = now_epoch();
            let created_at = now_rfc3339();
            b.write(
                &label,
                "INSERT INTO memories
                     (memory_id, content, summary, source, importance, emotional_intensity,
                      created_at, last_accessed, effective_importance, access_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?5, 0)",
                params![
                    memory_id,
                    memory.content,
                    memory.summary,
                    memory.source,
                    memory.importance,
                    memory.emotional_intensity,
                    created_at,
                    now,
                ],
            )?;

            for activation in activations {
                nodes::record_activation(b, &memory_id, activation.node_row, activation.score)?;
                nodes::bump_activation_count(b, activation.node_row, &created_at)?;
            }

            let rows: Vec<i64> = activations.iter().map(|a| a.node_row).collect();
            self.hebbian.strengthen_all(b, &rows)?;
            self.hebbian.record_coactivation(b)?;
            Ok(())
        })?;

        info!(
            memory_id = %memory_id,
            activations = activations.len(),
            source = %memory.source,
            "memory saved"
        );
        Ok(memory_id)
    }

    /// Nodes in category/name order, bounded by the configured list limit.
    pub fn list_nodes(&self) -> Result<Vec<super::types::Node>> {
        self.store
            .read(|conn| nodes::list_nodes(conn, self.node_list_limit))
    }
}
