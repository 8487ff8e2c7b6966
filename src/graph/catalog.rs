//! Node catalog loading and seeding.
//!
//! The catalog is a JSON list of concepts, either wrapped as
//! `{"nodes": [...]}` or as a bare array. A user catalog on disk takes
//! precedence over the seed catalog compiled into the binary. Seeding only
//! runs against an empty node table; existing keys are left untouched.

use rusqlite::params;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use super::nodes::ensure_edge;
use super::types::{now_epoch, now_rfc3339};
use crate::db::{count_rows, DualStore};
use crate::error::{MindError, Result};

const BUNDLED_CATALOG: &str = include_str!("../../data/nodes.json");

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogNode {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub prototype_phrases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped { nodes: Vec<CatalogNode> },
    Bare(Vec<CatalogNode>),
}

/// Parse catalog JSON in either accepted shape.
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogNode>> {
    let file: CatalogFile =
        serde_json::from_str(json).map_err(|e| MindError::Catalog(e.to_string()))?;
    let nodes = match file {
        CatalogFile::Wrapped { nodes } => nodes,
        CatalogFile::Bare(nodes) => nodes,
    };
    if let Some(bad) = nodes.iter().find(|n| n.id.trim().is_empty() || n.name.trim().is_empty()) {
        return Err(MindError::Catalog(format!(
            "catalog entry with empty id or name (category {:?})",
            bad.category
        )));
    }
    Ok(nodes)
}

/// The seed catalog shipped with the binary.
pub fn bundled_catalog() -> Result<Vec<CatalogNode>> {
    parse_catalog(BUNDLED_CATALOG)
}

/// User catalog at `path` if it exists and parses, otherwise the bundled one.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogNode>> {
    if path.exists() {
        match std::fs::read_to_string(path)
            .map_err(MindError::from)
            .and_then(|text| parse_catalog(&text))
        {
            Ok(nodes) => {
                info!(path = %path.display(), nodes = nodes.len(), "loaded user catalog");
                return Ok(nodes);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "unusable user catalog, falling back to bundled"),
        }
    }
    bundled_catalog()
}

/// Insert the catalog if the node table is empty. Same-category pairs are
/// linked at `category_edge_weight`. Returns the number of nodes inserted.
pub fn seed_if_empty(store: &DualStore, nodes: &[CatalogNode], category_edge_weight: f64) -> Result<usize> {
    let guard = store.lock();
    if count_rows(guard.durable(), "nodes")? > 0 {
        return Ok(0);
    }
    let inserted = seed(store, nodes, category_edge_weight)?;
    info!(nodes = inserted, "seeded node catalog");
    Ok(inserted)
}

/// Insert-if-absent every node, then link same-category pairs. One unit of work.
pub fn seed(store: &DualStore, nodes: &[CatalogNode], category_edge_weight: f64) -> Result<usize> {
    store.transaction("catalog", |b| {
        let created_at = now_rfc3339();
        let mut inserted = 0;
        for node in nodes {
            let keywords = serde_json::to_string(&node.keywords)
                .map_err(|e| MindError::Catalog(e.to_string()))?;
            let phrases = serde_json::to_string(&node.prototype_phrases)
                .map_err(|e| MindError::Catalog(e.to_string()))?;
            inserted += b.write(
                &format!("node {}", node.id),
                "INSERT OR IGNORE INTO nodes
                     (node_id, name, category, description, keywords, prototype_phrases, weight, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    node.id,
                    node.name,
                    node.category,
                    node.description,
                    keywords,
                    phrases,
                    node.weight.unwrap_or(1.0),
                    created_at,
                ],
            )?;
        }

        let mut by_category: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        {
            let mut stmt = b.durable().prepare("SELECT id, category FROM nodes ORDER BY id")?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
            for row in rows {
                let (id, category) = row?;
                by_category.entry(category).or_default().push(id);
            }
        }

        let now = now_epoch();
        for ids in by_category.values() {
            for (i, &a) in ids.iter().enumerate() {
                for &c in &ids[i + 1..] {
                    ensure_edge(b, a, c, category_edge_weight, now, &created_at)?;
                }
            }
        }
        Ok(inserted)
    })
}
