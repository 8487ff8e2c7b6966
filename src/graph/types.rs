//! Record types for the concept graph.
//!
//! [`Node`], [`Edge`], [`Memory`] and [`MemoryActivation`] mirror the four
//! stored tables. [`Activation`] is the Content Analyzer's output for one
//! node and is what a save persists as activation rows.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// A concept in the graph.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    /// Surrogate row id; edges and activations refer to this.
    pub id: i64,
    /// Stable external key from the catalog.
    pub node_id: String,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub prototype_phrases: Vec<String>,
    pub weight: f64,
    pub activation_count: i64,
    pub last_activated: Option<String>,
}

/// Compact node listing used by `list_nodes`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub node_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub activation_count: i64,
}

/// A neighbour returned by `related_nodes`.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedNode {
    pub node_id: String,
    pub name: String,
    pub category: String,
    pub weight: f64,
}

/// An undirected connection, stored with `source_id < target_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub source_id: i64,
    pub target_id: i64,
    pub weight: f64,
    pub co_activation_count: i64,
    /// Epoch seconds.
    pub last_strengthened: Option<f64>,
    /// Epoch seconds; used for idle-decay detection.
    pub last_coactivated: Option<f64>,
}

/// A stored memory with its access metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Memory {
    pub memory_id: String,
    pub content: String,
    pub summary: Option<String>,
    pub source: String,
    pub importance: f64,
    pub emotional_intensity: f64,
    pub created_at: String,
    /// Epoch seconds.
    pub last_accessed: Option<f64>,
    pub effective_importance: Option<f64>,
    pub access_count: i64,
    /// Activation scores for the nodes the query matched on.
    pub activations: Vec<NodeScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeScore {
    pub name: String,
    pub score: f64,
}

/// One row of `memory_activations`, resolved to external keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryActivation {
    pub memory_id: String,
    pub node_id: String,
    pub score: f64,
}

/// A node whose analyzer score crossed the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activation {
    /// Surrogate row id of the node.
    #[serde(skip)]
    pub node_row: i64,
    pub node_id: String,
    pub name: String,
    pub category: String,
    pub score: f64,
    pub matched_terms: Vec<String>,
    pub concept_boosted: bool,
}

/// Current time as fractional epoch seconds, the unit of every decay-relevant
/// timestamp column.
pub fn now_epoch() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Current time as an RFC 3339 string with microseconds, used for
/// `created_at` and `last_activated`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fresh external memory id. Random, so independent of content and clock.
pub fn new_memory_id() -> String {
    format!("mem_{}", uuid::Uuid::new_v4().simple())
}
