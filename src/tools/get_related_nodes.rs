//! MCP `get_related_nodes` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetRelatedNodesParams {
    #[schemars(description = "Name or id of the concept node")]
    pub node_name: String,

    #[schemars(description = "Minimum edge weight 0.0-10.0. Defaults to 0.1.")]
    pub min_weight: Option<f64>,
}
