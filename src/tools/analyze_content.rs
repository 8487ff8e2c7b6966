//! MCP `analyze_content` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeContentParams {
    #[schemars(description = "Text to score against the concept catalog. Nothing is stored.")]
    pub content: String,

    #[schemars(description = "Activation threshold 0.0-1.0. Defaults to the configured threshold (0.3).")]
    pub threshold: Option<f64>,
}
