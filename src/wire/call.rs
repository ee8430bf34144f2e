//! Results of `tools/call`, with and without server-side progress tracking.

use serde::{Deserialize, Serialize};

use super::content::Content;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isStreaming", default)]
    pub is_streaming: bool,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// `callToolWithTracking`'s result: the same `CallToolResult`, plus an
/// opaque server-minted operation id when the server supports progress
/// tracking. Servers that don't return one leave it absent; never
/// synthesize one here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallTracking {
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(flatten)]
    pub result: CallToolResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_call_tool_result() {
        let raw = json!({"content":[{"type":"text","text":"8"}]});
        let result: CallToolResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.content, vec![Content::Text { text: "8".to_string() }]);
        assert!(!result.is_streaming);
        assert_eq!(result.is_error, None);
    }

    #[test]
    fn tracking_leaves_absent_operation_id_absent() {
        let raw = json!({"content":[{"type":"text","text":"8"}]});
        let tracking: ToolCallTracking = serde_json::from_value(raw).unwrap();
        assert_eq!(tracking.operation_id, None);
    }

    #[test]
    fn tracking_carries_operation_id_when_present() {
        let raw = json!({"operationId":"op-1","content":[]});
        let tracking: ToolCallTracking = serde_json::from_value(raw).unwrap();
        assert_eq!(tracking.operation_id.as_deref(), Some("op-1"));
    }
}
