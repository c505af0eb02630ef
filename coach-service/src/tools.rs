//! Tool types for the agentic loop.
//!
//! - Core tool types (ToolCall, ToolResult)
//! - The registry submodule holding the static tool catalog

use serde::{Deserialize, Serialize};

pub mod registry;

pub use registry::{ToolDefinition, ToolName, ToolRegistry};

/// Tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Tool result folded back into the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

/// Tool execution outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutcome {
    Success { result: serde_json::Value },
    Error { error: String },
}

impl ToolResult {
    pub fn success(tool: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            outcome: ToolOutcome::Success { result },
        }
    }

    pub fn error(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            outcome: ToolOutcome::Error {
                error: error.into(),
            },
        }
    }
}
