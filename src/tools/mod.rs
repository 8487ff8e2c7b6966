pub mod analyze_content;
pub mod get_related_nodes;
pub mod list_nodes;
pub mod mind_status;
pub mod query_mind;
pub mod save_to_mind;
pub mod similarity;

use analyze_content::AnalyzeContentParams;
use get_related_nodes::GetRelatedNodesParams;
use list_nodes::ListNodesParams;
use mind_status::MindStatusParams;
use query_mind::QueryMindParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use save_to_mind::SaveToMindParams;
use serde::Serialize;
use serde_json::json;
use similarity::{SimilaritySearchParams, SimilarityStatusParams};
use std::sync::Arc;

use crate::error::MindError;
use crate::mind::Mind;

/// The Synaptic MCP tool handler. Every tool validates through [`Mind`] and
/// runs the core call on a blocking thread.
#[derive(Clone)]
pub struct MindTools {
    tool_router: ToolRouter<Self>,
    mind: Arc<Mind>,
}

#[tool_router]
impl MindTools {
    pub fn new(mind: Arc<Mind>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            mind,
        }
    }

    /// Analyze text, link it to the concepts it activates, and strengthen
    /// the connections between them.
    #[tool(description = "Save a memory. The text is scored against the concept catalog; every activated concept is linked to the memory and co-activated concepts are strengthened. Rejected if no concept reaches the activation threshold.")]
    async fn save_to_mind(
        &self,
        Parameters(params): Parameters<SaveToMindParams>,
    ) -> Result<String, String> {
        tracing::info!(content_len = params.content.len(), "save_to_mind called");
        self.run("save_to_mind", move |mind| {
            let outcome = mind.save(params.into())?;
            Ok(json!({
                "success": true,
                "memory_id": outcome.memory_id,
                "summary": outcome.summary,
                "activations": outcome.activations,
                "concepts": outcome.concepts,
            }))
        })
        .await
    }

    #[tool(description = "Retrieve memories linked to the named concept nodes, newest first. Decayed memories are hidden unless include_decayed is true.")]
    async fn query_mind(
        &self,
        Parameters(params): Parameters<QueryMindParams>,
    ) -> Result<String, String> {
        tracing::info!(nodes = params.node_names.len(), "query_mind called");
        self.run("query_mind", move |mind| {
            let result = mind.query(params.into())?;
            Ok(json!({
                "success": true,
                "count": result.memories.len(),
                "memories": result.memories,
                "matched_nodes": result.matched_nodes,
                "unknown_nodes": result.unknown_nodes,
            }))
        })
        .await
    }

    #[tool(description = "Score text against the concept catalog without saving anything. Returns activated concepts with scores and matched terms.")]
    async fn analyze_content(
        &self,
        Parameters(params): Parameters<AnalyzeContentParams>,
    ) -> Result<String, String> {
        self.run("analyze_content", move |mind| {
            let analysis = mind.analyze(&params.content, params.threshold)?;
            Ok(json!({
                "success": true,
                "activations": analysis.activations,
                "concepts": analysis.concepts,
            }))
        })
        .await
    }

    #[tool(description = "List concept nodes connected to a node, strongest connection first.")]
    async fn get_related_nodes(
        &self,
        Parameters(params): Parameters<GetRelatedNodesParams>,
    ) -> Result<String, String> {
        self.run("get_related_nodes", move |mind| {
            let related = mind.related_nodes(&params.node_name, params.min_weight)?;
            Ok(json!({ "success": true, "node": related.node, "category": related.category, "related": related.related }))
        })
        .await
    }

    #[tool(description = "Graph statistics, strongest connections, most active concepts, storage and decay status.")]
    async fn mind_status(
        &self,
        Parameters(_params): Parameters<MindStatusParams>,
    ) -> Result<String, String> {
        self.run("mind_status", |mind| mind.status()).await
    }

    #[tool(description = "List the concept catalog grouped by category.")]
    async fn list_nodes(
        &self,
        Parameters(params): Parameters<ListNodesParams>,
    ) -> Result<String, String> {
        self.run("list_nodes", move |mind| {
            let grouped = mind.list_nodes(params.category.as_deref())?;
            let total: usize = grouped.values().map(Vec::len).sum();
            Ok(json!({ "success": true, "total": total, "categories": grouped }))
        })
        .await
    }

    #[tool(description = "Search memories through the external similarity service, if one is configured.")]
    async fn similarity_search(
        &self,
        Parameters(params): Parameters<SimilaritySearchParams>,
    ) -> Result<String, String> {
        self.run("similarity_search", move |mind| {
            mind.similarity_search(&params.query, params.top_k)
        })
        .await
    }

    #[tool(description = "Report whether the external similarity service is configured and reachable.")]
    async fn similarity_status(
        &self,
        Parameters(_params): Parameters<SimilarityStatusParams>,
    ) -> Result<String, String> {
        self.run("similarity_status", |mind| mind.similarity_status()).await
    }
}

impl MindTools {
    /// Run `f` against the mind on a blocking thread and render the result as JSON.
    async fn run<T, F>(&self, tool: &'static str, f: F) -> Result<String, String>
    where
        T: Serialize + Send + 'static,
        F: FnOnce(&Mind) -> crate::error::Result<T> + Send + 'static,
    {
        let mind = Arc::clone(&self.mind);
        let outcome = tokio::task::spawn_blocking(move || f(&mind))
            .await
            .map_err(|e| failure_json(&format!("{tool} task failed: {e}"), None))?;

        match outcome {
            Ok(value) => serde_json::to_string(&value)
                .map_err(|e| failure_json(&format!("serialization failed: {e}"), None)),
            Err(e) => {
                tracing::warn!(tool, error = %e, "tool call failed");
                Err(failure(&e))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for MindTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Synaptic is an associative memory. Use save_to_mind to remember text, \
                 query_mind to recall memories by concept, and get_related_nodes to \
                 explore how concepts have become connected."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

/// Caller-facing failure body: sanitized message plus the limit that was hit.
fn failure(err: &MindError) -> String {
    failure_json(&err.sanitized(), err.limit())
}

fn failure_json(message: &str, limit: Option<f64>) -> String {
    let mut body = json!({ "success": false, "error": crate::error::sanitize_message(message) });
    if let Some(limit) = limit {
        body["limit"] = json!(limit);
    }
    body.to_string()
}
