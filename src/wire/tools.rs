//! `Tool` and its token-efficient projection, `ToolMetadata`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(rename = "supportsProgress", skip_serializing_if = "Option::is_none")]
    pub supports_progress: Option<bool>,
    #[serde(rename = "supportsCancellation", skip_serializing_if = "Option::is_none")]
    pub supports_cancellation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
}

impl From<&Tool> for ToolMetadata {
    fn from(tool: &Tool) -> Self {
        ToolMetadata { name: tool.name.clone(), description: tool.description.clone() }
    }
}

impl From<Tool> for ToolMetadata {
    fn from(tool: Tool) -> Self {
        ToolMetadata { name: tool.name, description: tool.description }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResult {
    pub tools: Vec<Tool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tool() -> Tool {
        Tool {
            name: "calculator".to_string(),
            description: "Perform basic calculations on two numbers with a chosen operation".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "operation": {"type": "string"},
                    "a": {"type": "number"},
                    "b": {"type": "number"},
                    "precision": {"type": "integer"},
                    "roundingMode": {"type": "string"}
                }
            }),
            supports_progress: Some(true),
            supports_cancellation: Some(true),
            metadata: Some(json!({"category": "math", "version": "1.0"})),
        }
    }

    #[test]
    fn round_trips_tool() {
        let tool = sample_tool();
        let encoded = serde_json::to_value(&tool).unwrap();
        let decoded: Tool = serde_json::from_value(encoded).unwrap();
        assert_eq!(tool, decoded);
    }

    #[test]
    fn metadata_projects_name_and_description_only() {
        let tool = sample_tool();
        let metadata = ToolMetadata::from(&tool);
        let encoded = serde_json::to_value(&metadata).unwrap();
        let keys: Vec<_> = encoded.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "description"]);
    }

    #[test]
    fn metadata_encoding_is_at_least_half_smaller() {
        let tool = sample_tool();
        let metadata = ToolMetadata::from(&tool);
        let tool_len = serde_json::to_string(&tool).unwrap().len();
        let metadata_len = serde_json::to_string(&metadata).unwrap().len();
        assert!(
            metadata_len as f64 <= 0.5 * tool_len as f64,
            "metadata encoding ({metadata_len}) not <= half of tool encoding ({tool_len})"
        );
    }
}
