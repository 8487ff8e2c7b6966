//! MCP `similarity_search` / `similarity_status` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SimilaritySearchParams {
    #[schemars(description = "Free-text query for the external similarity service")]
    pub query: String,

    #[schemars(description = "Number of results to return (1-100). Defaults to 5.")]
    pub top_k: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct SimilarityStatusParams {}
