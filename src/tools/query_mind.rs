//! MCP `query_mind` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::mind::QueryRequest;

/// Parameters for the `query_mind` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryMindParams {
    /// Node names or keys; matching is case-insensitive.
    #[schemars(description = "Concept node names or ids to look up (1-100). Case-insensitive.")]
    pub node_names: Vec<String>,

    #[schemars(description = "Maximum number of memories to return (1-500). Defaults to 20.")]
    pub limit: Option<usize>,

    #[schemars(
        description = "If true, also return memories whose effective importance has decayed below the threshold. Defaults to false."
    )]
    pub include_decayed: Option<bool>,
}

impl From<QueryMindParams> for QueryRequest {
    fn from(p: QueryMindParams) -> Self {
        Self {
            node_names: p.node_names,
            limit: p.limit,
            include_decayed: p.include_decayed.unwrap_or(false),
        }
    }
}
