//! Node lookups, bounded scans, and the per-row writes of the save path.
//!
//! Reads take a plain `&Connection` so the caller chooses the backend (the
//! mirror for queries, the durable store inside write paths). Writes take
//! `&Backends` and go through the dual-write path.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{Edge, MemoryActivation, Node, RelatedNode};
use crate::db::Backends;
use crate::error::{MindError, Result};

const NODE_COLUMNS: &str = "id, node_id, name, category, description, keywords, \
                            prototype_phrases, weight, activation_count, last_activated";

fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        node_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        keywords: json_list(row, 5)?,
        prototype_phrases: json_list(row, 6)?,
        weight: row.get(7)?,
        activation_count: row.get(8)?,
        last_activated: row.get(9)?,
    })
}

/// Case-insensitive match on external key or display name. A key match wins
/// over a name match.
pub fn lookup_node(conn: &Connection, name_or_key: &str) -> Result<Option<Node>> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM nodes
          WHERE LOWER(node_id) = LOWER(?1) OR LOWER(name) = LOWER(?1)
          ORDER BY (LOWER(node_id) = LOWER(?1)) DESC, id
          LIMIT 1"
    );
    let node = conn
        .query_row(&sql, [name_or_key], row_to_node)
        .optional()?;
    Ok(node)
}

/// Every node in catalog order. The analyzer scores against this.
pub fn load_nodes(conn: &Connection) -> Result<Vec<Node>> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let nodes = stmt
        .query_map([], row_to_node)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(nodes)
}

/// Bounded scan ordered by category then name.
pub fn list_nodes(conn: &Connection, limit: usize) -> Result<Vec<Node>> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY category, name LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let nodes = stmt
        .query_map([limit as i64], row_to_node)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(nodes)
}

/// `(min, max)` of two node ids.
pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Insert the edge between `a` and `b` if it does not exist yet.
/// Returns whether a row was created.
pub fn ensure_edge(b: &Backends, a: i64, c: i64, initial_weight: f64, now: f64, created_at: &str) -> Result<bool> {
    if a == c {
        return Err(MindError::validation(format!("node {a} cannot be linked to itself")));
    }
    let (source, target) = canonical_pair(a, c);
    let changed = b.write(
        &format!("edge {source}-{target}"),
        "INSERT OR IGNORE INTO edges
             (source_id, target_id, weight, co_activation_count, last_strengthened, created_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5)",
        params![source, target, initial_weight, now, created_at],
    )?;
    Ok(changed > 0)
}

pub fn get_edge(conn: &Connection, a: i64, c: i64) -> Result<Option<Edge>> {
    let (source, target) = canonical_pair(a, c);
    let edge = conn
        .query_row(
            "SELECT source_id, target_id, weight, co_activation_count, last_strengthened, last_coactivated
               FROM edges WHERE source_id = ?1 AND target_id = ?2",
            [source, target],
            |row| {
                Ok(Edge {
                    source_id: row.get(0)?,
                    target_id: row.get(1)?,
                    weight: row.get(2)?,
                    co_activation_count: row.get(3)?,
                    last_strengthened: row.get(4)?,
                    last_coactivated: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(edge)
}

/// Link a memory to a node it activated.
pub fn record_activation(b: &Backends, memory_id: &str, node_row: i64, score: f64) -> Result<()> {
    b.write(
        &format!("activation {memory_id}/{node_row}"),
        "INSERT INTO memory_activations (memory_id, node_id, activation_score)
         VALUES ((SELECT id FROM memories WHERE memory_id = ?1), ?2, ?3)",
        params![memory_id, node_row, score],
    )?;
    Ok(())
}

pub fn bump_activation_count(b: &Backends, node_row: i64, at: &str) -> Result<()> {
    let changed = b.write(
        &format!("node {node_row}"),
        "UPDATE nodes SET activation_count = activation_count + 1, last_activated = ?2 WHERE id = ?1",
        params![node_row, at],
    )?;
    if changed == 0 {
        return Err(MindError::NotFound(format!("node {node_row}")));
    }
    Ok(())
}

/// Neighbours of `node_row` with edge weight at least `min_weight`, strongest first.
pub fn related_nodes(conn: &Connection, node_row: i64, min_weight: f64) -> Result<Vec<RelatedNode>> {
    let mut stmt = conn.prepare(
        "SELECT n.node_id, n.name, n.category, e.weight
           FROM edges e
           JOIN nodes n ON (e.target_id = n.id OR e.source_id = n.id)
          WHERE (e.source_id = ?1 OR e.target_id = ?1)
            AND n.id != ?1
            AND e.weight >= ?2
          ORDER BY e.weight DESC, n.name",
    )?;
    let related = stmt
        .query_map(params![node_row, min_weight], |row| {
            Ok(RelatedNode {
                node_id: row.get(0)?,
                name: row.get(1)?,
                category: row.get(2)?,
                weight: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(related)
}

/// Activation rows of one memory, in node order.
pub fn activations_for(conn: &Connection, memory_id: &str) -> Result<Vec<MemoryActivation>> {
    let mut stmt = conn.prepare(
        "SELECT m.memory_id, n.node_id, ma.activation_score
           FROM memory_activations ma
           JOIN memories m ON m.id = ma.memory_id
           JOIN nodes n ON n.id = ma.node_id
          WHERE m.memory_id = ?1
          ORDER BY n.id",
    )?;
    let rows = stmt
        .query_map([memory_id], |row| {
            Ok(MemoryActivation {
                memory_id: row.get(0)?,
                node_id: row.get(1)?,
                score: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
