//! MCP `list_nodes` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListNodesParams {
    #[schemars(description = "Only list nodes in this category (case-insensitive)")]
    pub category: Option<String>,
}
