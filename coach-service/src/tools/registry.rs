//! Static tool catalog presented to the completion service.
//!
//! Tool names are derived from enum variants via strum, so the catalog,
//! the wire definitions, and the dispatcher cannot drift apart. Unknown
//! tool names from the model fail `ToolName::from_str` instead of being
//! dispatched dynamically.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// All tool names as an exhaustive enum.
///
/// Adding a new tool requires a variant here, metadata below, and a
/// handler arm in the dispatcher (compile error if missing).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    AppendTasks,
    OverwriteTasks,
    FetchTasks,
}

impl ToolName {
    /// Whether executing this tool changes the user's todo list.
    /// After a mutating tool the loop forces a textual reply.
    pub fn mutates_list(&self) -> bool {
        matches!(self, ToolName::AppendTasks | ToolName::OverwriteTasks)
    }
}

/// Metadata for a tool definition
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub name: ToolName,
    pub description: &'static str,
    /// JSON Schema for tool parameters
    pub parameters: fn() -> serde_json::Value,
}

/// Tool definition in the completion API's function-calling format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Central registry of all tools
pub struct ToolRegistry {
    tools: HashMap<ToolName, ToolMetadata>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut tools = HashMap::new();
        for tool in [append_tasks(), overwrite_tasks(), fetch_tasks()] {
            tools.insert(tool.name, tool);
        }
        Self { tools }
    }

    /// Check that every tool name has catalog metadata. Run at startup so
    /// a missing registration fails fast instead of at dispatch time.
    pub fn validate(&self) -> Result<(), String> {
        for name in ToolName::iter() {
            if !self.tools.contains_key(&name) {
                return Err(format!("tool {name} has no registered metadata"));
            }
        }
        Ok(())
    }

    /// Render the catalog as wire definitions for the completion request
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut names: Vec<ToolName> = self.tools.keys().copied().collect();
        names.sort_by_key(|n| n.to_string());
        names
            .into_iter()
            .map(|name| {
                let t = &self.tools[&name];
                ToolDefinition {
                    tool_type: "function".to_string(),
                    function: FunctionDefinition {
                        name: t.name.to_string(),
                        description: t.description.to_string(),
                        parameters: (t.parameters)(),
                    },
                }
            })
            .collect()
    }

    /// Parse a model-supplied tool name against the catalog
    pub fn parse(&self, name: &str) -> Option<ToolName> {
        ToolName::from_str(name)
            .ok()
            .filter(|n| self.tools.contains_key(n))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn append_tasks() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::AppendTasks,
        description: "Given a description of tasks the user has to do and roughly how long \
                      they take, parses them into an organized todo list and appends it to \
                      the user's existing list. Call this when the user provides tasks. If \
                      the description lacks enough detail to estimate lengths, ask follow-up \
                      questions before calling.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "taskDescription": {
                        "type": "string",
                        "description": "The user's tasks and their estimated time to complete"
                    }
                },
                "required": ["taskDescription"]
            })
        },
    }
}

fn overwrite_tasks() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::OverwriteTasks,
        description: "Like appendTasks, but fully replaces the user's existing todo list \
                      with the parsed tasks. Call this only when the user wants to start \
                      over with a fresh list.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "taskDescription": {
                        "type": "string",
                        "description": "The user's tasks and their estimated time to complete"
                    }
                },
                "required": ["taskDescription"]
            })
        },
    }
}

fn fetch_tasks() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::FetchTasks,
        description: "Fetch the user's current todo list. Call this when the user asks \
                      what is on their list or how much they have left to do.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {}
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_string_conversion() {
        assert_eq!(ToolName::AppendTasks.to_string(), "appendTasks");
        assert_eq!(ToolName::OverwriteTasks.to_string(), "overwriteTasks");
        assert_eq!(ToolName::FetchTasks.to_string(), "fetchTasks");
    }

    #[test]
    fn test_tool_name_from_string() {
        assert_eq!(
            ToolName::from_str("appendTasks").unwrap(),
            ToolName::AppendTasks
        );
        assert!(ToolName::from_str("unknown_tool").is_err());
    }

    #[test]
    fn test_registry_validates() {
        let registry = ToolRegistry::new();
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_registry_parse_rejects_unknown_names() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.parse("fetchTasks"), Some(ToolName::FetchTasks));
        assert_eq!(registry.parse("dropTables"), None);
    }

    #[test]
    fn test_definitions_cover_catalog() {
        let definitions = ToolRegistry::new().definitions();
        assert_eq!(definitions.len(), 3);
        for def in &definitions {
            assert_eq!(def.tool_type, "function");
            assert!(!def.function.description.is_empty());
        }
    }

    #[test]
    fn test_mutating_tools() {
        assert!(ToolName::AppendTasks.mutates_list());
        assert!(ToolName::OverwriteTasks.mutates_list());
        assert!(!ToolName::FetchTasks.mutates_list());
    }
}
