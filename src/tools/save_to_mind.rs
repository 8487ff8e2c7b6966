//! MCP `save_to_mind` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::mind::SaveRequest;

/// Parameters for the `save_to_mind` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SaveToMindParams {
    #[schemars(description = "The text to remember (up to 100,000 characters)")]
    pub content: String,

    #[schemars(
        description = "Optional short summary. When omitted, one is built from the activated concept names."
    )]
    pub summary: Option<String>,

    #[schemars(description = "Where this memory came from. Defaults to 'synaptic'.")]
    pub source: Option<String>,

    #[schemars(description = "Importance 0.0-1.0. Defaults to 0.5. At 0.9 or above the memory never decays.")]
    pub importance: Option<f64>,

    #[schemars(description = "Emotional intensity 0.0-1.0. Defaults to 0.5.")]
    pub emotional_intensity: Option<f64>,
}

impl From<SaveToMindParams> for SaveRequest {
    fn from(p: SaveToMindParams) -> Self {
        Self {
            content: p.content,
            summary: p.summary,
            source: p.source,
            importance: p.importance,
            emotional_intensity: p.emotional_intensity,
        }
    }
}
