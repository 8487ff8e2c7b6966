//! Reading memories back through the nodes they activated.

use rusqlite::types::Value;
use serde::Serialize;

use super::nodes;
use super::store::GraphStore;
use super::types::{Memory, Node, NodeScore, RelatedNode};
use crate::error::Result;

/// Largest number of memories a single query may return.
pub const MAX_QUERY_LIMIT: usize = 500;
pub const DEFAULT_QUERY_LIMIT: usize = 20;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub memories: Vec<Memory>,
    /// Names that resolved to a node.
    pub matched_nodes: Vec<String>,
    /// Names that matched nothing.
    pub unknown_nodes: Vec<String>,
}

impl GraphStore {
    /// Memories that activated any of `node_names`, newest first.
    ///
    /// `limit` is clamped to `1..=500`. With `decay_floor` set, memories whose
    /// effective importance fell below it are left out.
    pub fn query(&self, node_names: &[String], limit: usize, decay_floor: Option<f64>) -> Result<QueryResult> {
        let limit = limit.clamp(1, MAX_QUERY_LIMIT);
        let guard = self.store.lock();
        let conn = guard.reader();

        let mut ids = Vec::new();
        let mut matched_nodes = Vec::new();
        let mut unknown_nodes = Vec::new();
        for name in node_names {
            match nodes::lookup_node(conn, name)? {
                Some(node) => {
                    if !ids.contains(&node.id) {
                        ids.push(node.id);
                        matched_nodes.push(node.name);
                    }
                }
                None => unknown_nodes.push(name.clone()),
            }
        }

        if ids.is_empty() {
            return Ok(QueryResult {
                memories: Vec::new(),
                matched_nodes,
                unknown_nodes,
            });
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let decay_clause = if decay_floor.is_some() {
            "AND (m.effective_importance IS NULL OR m.effective_importance >= ?)"
        } else {
            ""
        };
        let sql = format!(
            "SELECT m.memory_id, m.content, m.summary, m.source, m.importance,
                    m.emotional_intensity, m.created_at, m.last_accessed,
                    m.effective_importance, m.access_count,
                    GROUP_CONCAT(n.name || char(31) || ma.activation_score, char(30))
               FROM memories m
               JOIN memory_activations ma ON ma.memory_id = m.id
               JOIN nodes n ON n.id = ma.node_id
              WHERE ma.node_id IN ({placeholders})
                {decay_clause}
              GROUP BY m.id
              ORDER BY m.created_at DESC, m.id DESC
              LIMIT ?"
        );

        let mut values: Vec<Value> = ids.iter().map(|&id| Value::Integer(id)).collect();
        if let Some(floor) = decay_floor {
            values.push(Value::Real(floor));
        }
        values.push(Value::Integer(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let memories = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), |row| {
                let packed: Option<String> = row.get(10)?;
                Ok(Memory {
                    memory_id: row.get(0)?,
                    content: row.get(1)?,
                    summary: row.get(2)?,
                    source: row.get(3)?,
                    importance: row.get(4)?,
                    emotional_intensity: row.get(5)?,
                    created_at: row.get(6)?,
                    last_accessed: row.get(7)?,
                    effective_importance: row.get(8)?,
                    access_count: row.get(9)?,
                    activations: unpack_scores(packed.as_deref()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(QueryResult {
            memories,
            matched_nodes,
            unknown_nodes,
        })
    }

    /// Resolve `name` and list its neighbours, under one guard so the node
    /// cannot change between the lookup and the join.
    pub fn related(&self, name: &str, min_weight: f64) -> Result<Option<(Node, Vec<RelatedNode>)>> {
        let guard = self.store.lock();
        let conn = guard.reader();
        let Some(node) = nodes::lookup_node(conn, name)? else {
            return Ok(None);
        };
        let related = nodes::related_nodes(conn, node.id, min_weight)?;
        Ok(Some((node, related)))
    }
}

fn unpack_scores(packed: Option<&str>) -> Vec<NodeScore> {
    let Some(packed) = packed else {
        return Vec::new();
    };
    packed
        .split(RECORD_SEP)
        .filter_map(|entry| {
            let (name, score) = entry.rsplit_once(FIELD_SEP)?;
            Some(NodeScore {
                name: name.to_string(),
                score: score.parse().ok()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_concatenated_scores() {
        let packed = "Architecture\u{1f}0.6\u{1e}Deployment: CI\u{1f}0.7";
        let scores = unpack_scores(Some(packed));
        assert_eq!(
            scores,
            vec![
                NodeScore { name: "Architecture".into(), score: 0.6 },
                NodeScore { name: "Deployment: CI".into(), score: 0.7 },
            ]
        );
        assert!(unpack_scores(None).is_empty());
    }
}
