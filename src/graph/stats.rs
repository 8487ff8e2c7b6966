use rusqlite::Connection;
use serde::Serialize;

use crate::db::count_rows;
use crate::error::Result;

const TOP_N: i64 = 10;

/// Graph-wide counts plus the strongest edges and most active nodes.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub node_count: i64,
    pub edge_count: i64,
    pub memory_count: i64,
    pub total_activations: i64,
    pub strongest_edges: Vec<EdgeSummary>,
    pub most_active_nodes: Vec<NodeActivity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeSummary {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub co_activation_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeActivity {
    pub name: String,
    pub category: String,
    pub activation_count: i64,
}

pub fn graph_stats(conn: &Connection) -> Result<GraphStats> {
    let total_activations: i64 = conn.query_row(
        "SELECT COALESCE(SUM(activation_count), 0) FROM nodes",
        [],
        |r| r.get(0),
    )?;

    let strongest_edges = {
        let mut stmt = conn.prepare(
            "SELECT s.name, t.name, e.weight, e.co_activation_count
               FROM edges e
               JOIN nodes s ON s.id = e.source_id
               JOIN nodes t ON t.id = e.target_id
              ORDER BY e.weight DESC, e.co_activation_count DESC
              LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([TOP_N], |r| {
                Ok(EdgeSummary {
                    source: r.get(0)?,
                    target: r.get(1)?,
                    weight: r.get(2)?,
                    co_activation_count: r.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let most_active_nodes = {
        let mut stmt = conn.prepare(
            "SELECT name, category, activation_count FROM nodes
              WHERE activation_count > 0
              ORDER BY activation_count DESC, name
              LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([TOP_N], |r| {
                Ok(NodeActivity {
                    name: r.get(0)?,
                    category: r.get(1)?,
                    activation_count: r.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    Ok(GraphStats {
        node_count: count_rows(conn, "nodes")?,
        edge_count: count_rows(conn, "edges")?,
        memory_count: count_rows(conn, "memories")?,
        total_activations,
        strongest_edges,
        most_active_nodes,
    })
}
