//! JSON-RPC 2.0 envelope and MCP domain types, with canonical encode/decode.
//!
//! Submodules mirror the entity groupings in the data model: the envelope
//! itself, capability records, the `Content` tagged union, and one module
//! per domain area (tools, resources, prompts, sampling, roots, health,
//! tool-call results).

pub mod call;
pub mod capabilities;
pub mod content;
pub mod health;
pub mod jsonrpc;
pub mod prompts;
pub mod resources;
pub mod roots;
pub mod sampling;
pub mod tools;

pub use call::{CallToolResult, ToolCallTracking};
pub use capabilities::{ClientCapabilities, ServerCapabilities};
pub use content::Content;
pub use health::ServerHealth;
pub use jsonrpc::{JsonRpcErrorObject, JsonRpcMessage, RequestId};
pub use prompts::{GetPromptResult, Prompt, PromptArgument, PromptListResult, PromptMessage};
pub use resources::{ReadResourceResult, Resource, ResourceContentInfo, ResourceListResult, ResourceTemplate, ResourceTemplateListResult};
pub use roots::{Root, RootListResult};
pub use sampling::{CreateMessageRequestParams, CreateMessageResult, SamplingMessage};
pub use tools::{Tool, ToolListResult, ToolMetadata};

use serde::{Deserialize, Serialize};

/// `clientInfo` / `serverInfo` in the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "clientInfo")]
    pub client_info: ImplementationInfo,
    pub capabilities: ClientCapabilities,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ImplementationInfo,
    pub capabilities: ServerCapabilities,
}
