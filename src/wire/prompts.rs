//! Prompts: named, parameterized message templates a server exposes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::Content;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptListResult {
    pub prompts: Vec<Prompt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_get_prompt_result() {
        let result = GetPromptResult {
            description: Some("greets the user".to_string()),
            messages: vec![PromptMessage { role: "user".to_string(), content: Content::Text { text: "hi".to_string() } }],
        };
        let encoded = serde_json::to_value(&result).unwrap();
        let decoded: GetPromptResult = serde_json::from_value(encoded).unwrap();
        assert_eq!(result, decoded);
    }
}
