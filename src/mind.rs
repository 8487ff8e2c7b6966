//! The [`Mind`] handle: every component wired over one [`DualStore`].
//!
//! Callers (MCP tools, CLI commands, tests) go through `Mind` and never touch
//! the store directly. Input limits are enforced here, before any storage
//! access. All methods block; async callers use `spawn_blocking`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analyzer::{Analysis, ContentAnalyzer};
use crate::augment::{self, ConceptExtractor, SimilaritySearch};
use crate::config::SynapticConfig;
use crate::db::{DualStore, DualWriteStatus, StoreLayout};
use crate::error::{MindError, Result};
use crate::graph::catalog;
use crate::graph::decay::{DecayStats, DecayStatus};
use crate::graph::nodes;
use crate::graph::query::{QueryResult, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
use crate::graph::stats::{graph_stats, GraphStats};
use crate::graph::types::{Activation, Node, NodeSummary, RelatedNode};
use crate::graph::{DecayEngine, DecayParams, GraphStore, HebbianEngine, HebbianParams, NewMemory};

pub const MAX_CONTENT_CHARS: usize = 100_000;
pub const MAX_SUMMARY_CHARS: usize = 10_000;
pub const MAX_SOURCE_CHARS: usize = 200;
pub const MAX_QUERY_NODES: usize = 100;
pub const MAX_NODE_NAME_CHARS: usize = 500;
pub const MAX_RELATED_MIN_WEIGHT: f64 = 10.0;
pub const MAX_TOP_K: usize = 100;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SOURCE: &str = "synaptic";
pub const DEFAULT_IMPORTANCE: f64 = 0.5;
pub const DEFAULT_RELATED_MIN_WEIGHT: f64 = 0.1;

const SUMMARY_NODE_COUNT: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub content: String,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub importance: Option<f64>,
    pub emotional_intensity: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub memory_id: String,
    pub summary: String,
    pub activations: Vec<Activation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub node_names: Vec<String>,
    pub limit: Option<usize>,
    pub include_decayed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedOutcome {
    pub node: String,
    pub category: String,
    pub related: Vec<RelatedNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MindStatus {
    pub graph: GraphStats,
    pub dual_write: DualWriteStatus,
    pub decay: DecayStatus,
    pub decay_stats: DecayStats,
    /// Saves that triggered strengthening since start.
    pub coactivations: u64,
    pub similarity_available: bool,
}

pub struct Mind {
    store: DualStore,
    graph: GraphStore,
    decay: DecayEngine,
    analyzer: ContentAnalyzer,
    similarity: Arc<dyn SimilaritySearch>,
    config: Arc<SynapticConfig>,
}

impl Mind {
    /// Open storage from config, seed the catalog on first run and build the
    /// engines with the configured augmentation services.
    pub fn open(config: SynapticConfig) -> Result<Self> {
        let layout = StoreLayout {
            durable: config.resolved_db_path(),
            fast: config.resolved_fast_path(),
        };
        let (store, _outcome) = DualStore::open(layout)?;

        let catalog_nodes = catalog::load_catalog(&config.resolved_catalog_path())?;
        catalog::seed_if_empty(&store, &catalog_nodes, config.hebbian.category_edge_weight)?;

        let extractor = augment::create_extractor(&config.augment)?;
        let similarity = augment::create_similarity(&config.augment);
        Self::with_parts(store, config, Arc::from(extractor), Arc::from(similarity))
    }

    /// Build over an existing store with explicit augmentation services.
    /// The store must already hold the node catalog.
    pub fn with_parts(
        store: DualStore,
        config: SynapticConfig,
        extractor: Arc<dyn ConceptExtractor>,
        similarity: Arc<dyn SimilaritySearch>,
    ) -> Result<Self> {
        config.validate()?;
        let hebbian = Arc::new(HebbianEngine::new(
            store.clone(),
            HebbianParams::from(&config.hebbian),
        ));
        let graph = GraphStore::new(store.clone(), hebbian, config.storage.node_list_limit);
        let decay = DecayEngine::new(store.clone(), DecayParams::from(&config.decay));

        let catalog = store.read(nodes::load_nodes)?;
        let analyzer = ContentAnalyzer::new(catalog, extractor, config.hebbian.activation_threshold);
        info!(
            nodes = analyzer.node_count(),
            similarity = similarity.is_available(),
            "mind ready"
        );

        Ok(Self {
            store,
            graph,
            decay,
            analyzer,
            similarity,
            config: Arc::new(config),
        })
    }

    pub fn store(&self) -> &DualStore {
        &self.store
    }

    pub fn decay(&self) -> &DecayEngine {
        &self.decay
    }

    pub fn config(&self) -> &SynapticConfig {
        &self.config
    }

    /// Analyze and persist a memory. Rejected when no node crosses the
    /// activation threshold.
    pub fn save(&self, request: SaveRequest) -> Result<SaveOutcome> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(MindError::validation("content must not be empty"));
        }
        check_len("content", content, MAX_CONTENT_CHARS)?;
        let summary = request
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(s) = &summary {
            check_len("summary", s, MAX_SUMMARY_CHARS)?;
        }
        let source = request
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        check_len("source", &source, MAX_SOURCE_CHARS)?;
        let importance = check_unit("importance", request.importance.unwrap_or(DEFAULT_IMPORTANCE))?;
        let emotional_intensity = check_unit(
            "emotional_intensity",
            request.emotional_intensity.unwrap_or(DEFAULT_IMPORTANCE),
        )?;

        let Analysis {
            mut activations,
            concepts,
        } = self.analyzer.analyze(content, None);
        // a zero threshold admits unmatched nodes; only real matches are linked
        activations.retain(|a| a.score > 0.0);
        if activations.is_empty() {
            let threshold = self.analyzer.default_threshold();
            return Err(MindError::validation_with_limit(
                format!("no concept node reached the activation threshold ({threshold})"),
                threshold,
            ));
        }

        let summary = summary.unwrap_or_else(|| auto_summary(&activations));
        let memory = NewMemory {
            content: content.to_string(),
            summary: Some(summary.clone()),
            source,
            importance,
            emotional_intensity,
        };
        let memory_id = self.graph.save(&memory, &activations)?;

        Ok(SaveOutcome {
            memory_id,
            summary,
            activations,
            concepts,
        })
    }

    /// Memories linked to any of the named nodes, newest first. Returned
    /// memories are touched afterwards; a failed touch is only logged.
    /// Touching revives a memory: its effective importance is reset to its importance.
    pub fn query(&self, request: QueryRequest) -> Result<QueryResult> {
        let names: Vec<String> = request
            .node_names
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(MindError::validation("node_names must contain at least one name"));
        }
        if names.len() > MAX_QUERY_NODES {
            return Err(MindError::validation_with_limit(
                format!("at most {MAX_QUERY_NODES} node names per query"),
                MAX_QUERY_NODES as f64,
            ));
        }
        for name in &names {
            check_len("node name", name, MAX_NODE_NAME_CHARS)?;
        }
        let limit = request.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        if limit == 0 || limit > MAX_QUERY_LIMIT {
            return Err(MindError::validation_with_limit(
                format!("limit must be between 1 and {MAX_QUERY_LIMIT}"),
                MAX_QUERY_LIMIT as f64,
            ));
        }

        let decay_floor = (self.decay.params().enabled && !request.include_decayed)
            .then_some(self.decay.params().threshold);
        let result = self.graph.query(&names, limit, decay_floor)?;

        let ids: Vec<String> = result.memories.iter().map(|m| m.memory_id.clone()).collect();
        if !ids.is_empty() {
            self.touch_later(ids);
        }
        Ok(result)
    }

    /// Run `touch` off the caller's path when a runtime is available, inline otherwise.
    fn touch_later(&self, ids: Vec<String>) {
        let decay = self.decay.clone();
        let run = move || match decay.touch(&ids) {
            Ok(n) => debug!(touched = n, "query results touched"),
            Err(e) => warn!(error = %e, "failed to touch queried memories"),
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(run);
            }
            Err(_) => run(),
        }
    }

    /// Score `content` against the catalog without storing anything.
    pub fn analyze(&self, content: &str, threshold: Option<f64>) -> Result<Analysis> {
        if content.trim().is_empty() {
            return Err(MindError::validation("content must not be empty"));
        }
        check_len("content", content, MAX_CONTENT_CHARS)?;
        if let Some(t) = threshold {
            check_unit("threshold", t)?;
        }
        Ok(self.analyzer.analyze(content, threshold))
    }

    /// Neighbours of a node by edge weight. Unlike `query`, an unknown node is
    /// an error here since the caller named one specific node.
    pub fn related_nodes(&self, name: &str, min_weight: Option<f64>) -> Result<RelatedOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MindError::validation("node_name must not be empty"));
        }
        check_len("node_name", name, MAX_NODE_NAME_CHARS)?;
        let min_weight = min_weight.unwrap_or(DEFAULT_RELATED_MIN_WEIGHT);
        if !(0.0..=MAX_RELATED_MIN_WEIGHT).contains(&min_weight) {
            return Err(MindError::validation_with_limit(
                format!("min_weight must be between 0 and {MAX_RELATED_MIN_WEIGHT}"),
                MAX_RELATED_MIN_WEIGHT,
            ));
        }

        let (node, related) = self
            .graph
            .related(name, min_weight)?
            .ok_or_else(|| MindError::NotFound(format!("node '{name}'")))?;
        Ok(RelatedOutcome {
            node: node.name,
            category: node.category,
            related,
        })
    }

    /// Catalog nodes grouped by category, optionally a single category.
    pub fn list_nodes(&self, category: Option<&str>) -> Result<BTreeMap<String, Vec<NodeSummary>>> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let mut grouped: BTreeMap<String, Vec<NodeSummary>> = BTreeMap::new();
        for node in self.graph.list_nodes()? {
            if category.is_some_and(|c| !c.eq_ignore_ascii_case(&node.category)) {
                continue;
            }
            let Node {
                node_id,
                name,
                category,
                description,
                activation_count,
                ..
            } = node;
            grouped.entry(category).or_default().push(NodeSummary {
                node_id,
                name,
                description,
                activation_count,
            });
        }
        Ok(grouped)
    }

    pub fn status(&self) -> Result<MindStatus> {
        Ok(MindStatus {
            graph: self.store.read(graph_stats)?,
            dual_write: self.store.status(),
            decay: self.decay.status(),
            decay_stats: self.decay.stats()?,
            coactivations: self.graph.hebbian().coactivation_count(),
            similarity_available: self.similarity.is_available(),
        })
    }

    pub fn similarity_search(&self, query: &str, top_k: Option<usize>) -> Result<serde_json::Value> {
        if query.trim().is_empty() {
            return Err(MindError::validation("query must not be empty"));
        }
        check_len("query", query, MAX_CONTENT_CHARS)?;
        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(MindError::validation_with_limit(
                format!("top_k must be between 1 and {MAX_TOP_K}"),
                MAX_TOP_K as f64,
            ));
        }
        self.similarity.search(query, top_k)
    }

    pub fn similarity_status(&self) -> Result<serde_json::Value> {
        self.similarity.status()
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(MindError::validation_with_limit(
            format!("{field} exceeds {max} characters"),
            max as f64,
        ));
    }
    Ok(())
}

fn check_unit(field: &str, value: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(MindError::validation(format!(
            "{field} must be between 0 and 1, got {value}"
        )));
    }
    Ok(value)
}

fn auto_summary(activations: &[Activation]) -> String {
    let names: Vec<&str> = activations
        .iter()
        .take(SUMMARY_NODE_COUNT)
        .map(|a| a.name.as_str())
        .collect();
    format!("Activated {} concepts: {}", activations.len(), names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{NoConcepts, NoSimilarity};
    use crate::graph::catalog::parse_catalog;

    const CATALOG: &str = r#"[
        {"id": "architecture", "name": "Architecture", "category": "engineering",
         "keywords": ["architecture"], "prototype_phrases": ["microservices architecture"]},
        {"id": "deployment", "name": "Deployment", "category": "engineering",
         "keywords": ["deployment"], "prototype_phrases": ["independent deployment"]},
        {"id": "joy", "name": "Joy", "category": "emotion",
         "keywords": ["joy", "happy"], "prototype_phrases": []}
    ]"#;

    fn mind() -> Mind {
        let store = DualStore::open_in_memory().unwrap();
        catalog::seed(&store, &parse_catalog(CATALOG).unwrap(), 0.1).unwrap();
        Mind::with_parts(
            store,
            SynapticConfig::default(),
            Arc::new(NoConcepts),
            Arc::new(NoSimilarity),
        )
        .unwrap()
    }

    fn save(mind: &Mind, content: &str) -> Result<SaveOutcome> {
        mind.save(SaveRequest {
            content: content.into(),
            ..SaveRequest::default()
        })
    }

    #[test]
    fn save_builds_summary_from_activations() {
        let mind = mind();
        let out = save(
            &mind,
            "Microservices architecture enables independent deployment of services",
        )
        .unwrap();
        assert!(out.memory_id.starts_with("mem_"));
        assert_eq!(out.activations.len(), 2);
        assert!(out.summary.starts_with("Activated 2 concepts: "));
    }

    #[test]
    fn save_without_activation_reports_threshold() {
        let mind = mind();
        let err = save(&mind, "nothing relevant at all").unwrap_err();
        assert!(matches!(err, MindError::Validation { .. }));
        assert_eq!(err.limit(), Some(0.3));
        assert_eq!(mind.status().unwrap().graph.memory_count, 0);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let store = DualStore::open_in_memory().unwrap();
        catalog::seed(&store, &parse_catalog(CATALOG).unwrap(), 0.1).unwrap();
        let mut config = SynapticConfig::default();
        config.hebbian.homeostatic_interval = 0;
        let built = Mind::with_parts(store, config, Arc::new(NoConcepts), Arc::new(NoSimilarity));
        assert!(matches!(built, Err(MindError::Config(_))));
    }

    #[test]
    fn zero_threshold_save_links_only_matched_nodes() {
        let store = DualStore::open_in_memory().unwrap();
        catalog::seed(&store, &parse_catalog(CATALOG).unwrap(), 0.1).unwrap();
        let mut config = SynapticConfig::default();
        config.hebbian.activation_threshold = 0.0;
        let mind = Mind::with_parts(store, config, Arc::new(NoConcepts), Arc::new(NoSimilarity)).unwrap();

        let out = save(&mind, "a happy day").unwrap();
        assert_eq!(out.activations.len(), 1);
        assert_eq!(out.activations[0].name, "Joy");
        assert!(save(&mind, "nothing relevant at all").is_err());
    }

    #[test]
    fn save_rejects_out_of_range_input() {
        let mind = mind();
        assert!(save(&mind, "   ").is_err());
        let long = "joy ".repeat(MAX_CONTENT_CHARS);
        assert_eq!(save(&mind, &long).unwrap_err().limit(), Some(MAX_CONTENT_CHARS as f64));
        let bad = mind.save(SaveRequest {
            content: "happy joy".into(),
            importance: Some(1.5),
            ..SaveRequest::default()
        });
        assert!(bad.is_err());
    }

    #[test]
    fn query_returns_saved_memory_and_unknown_names() {
        let mind = mind();
        let saved = save(&mind, "pure joy, a happy day").unwrap();
        let result = mind
            .query(QueryRequest {
                node_names: vec!["joy".into(), "Nonexistent".into()],
                ..QueryRequest::default()
            })
            .unwrap();
        assert_eq!(result.memories.len(), 1);
        assert_eq!(result.memories[0].memory_id, saved.memory_id);
        assert_eq!(result.unknown_nodes, vec!["Nonexistent".to_string()]);
    }

    #[test]
    fn query_validates_names_and_limit() {
        let mind = mind();
        assert!(mind.query(QueryRequest::default()).is_err());
        let too_many = QueryRequest {
            node_names: vec!["Joy".into(); MAX_QUERY_NODES + 1],
            ..QueryRequest::default()
        };
        assert!(mind.query(too_many).is_err());
        let bad_limit = QueryRequest {
            node_names: vec!["Joy".into()],
            limit: Some(MAX_QUERY_LIMIT + 1),
            ..QueryRequest::default()
        };
        assert!(mind.query(bad_limit).is_err());
    }

    #[test]
    fn related_nodes_follow_category_edges() {
        let mind = mind();
        let out = mind.related_nodes("architecture", None).unwrap();
        assert_eq!(out.node, "Architecture");
        assert_eq!(out.related.len(), 1);
        assert_eq!(out.related[0].name, "Deployment");

        assert!(matches!(
            mind.related_nodes("Nowhere", None),
            Err(MindError::NotFound(_))
        ));
        assert!(mind.related_nodes("Joy", Some(11.0)).is_err());
    }

    #[test]
    fn list_nodes_groups_and_filters_by_category() {
        let mind = mind();
        let all = mind.list_nodes(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["engineering"].len(), 2);

        let emotion = mind.list_nodes(Some("Emotion")).unwrap();
        assert_eq!(emotion.len(), 1);
        assert_eq!(emotion["emotion"][0].name, "Joy");
    }

    #[test]
    fn similarity_is_optional() {
        let mind = mind();
        assert!(!mind.status().unwrap().similarity_available);
        assert!(matches!(
            mind.similarity_search("q", None),
            Err(MindError::Augment(_))
        ));
        assert!(mind.similarity_search("q", Some(0)).is_err());
        assert_eq!(mind.similarity_status().unwrap()["available"], false);
    }
}
