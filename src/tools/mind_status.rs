//! MCP `mind_status` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `mind_status` MCP tool. Takes none.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct MindStatusParams {}
