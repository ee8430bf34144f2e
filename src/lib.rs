//! Client-side core of the Model Context Protocol.
//!
//! `mcp_client_core` owns the JSON-RPC session engine, the capability-gated
//! protocol facade, and the two streaming transports (stdio subprocess,
//! HTTP+SSE). It does not implement an MCP server, a generic JSON-RPC
//! library, persistence, OAuth token minting, or a multi-server plugin
//! manager — those are host-application concerns layered on top.

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod tool_cache;
pub mod transport;
pub mod wire;

pub use client::{Client, ClientBuilder, MCP_PROTOCOL_VERSION};
pub use config::{ClientConfig, HandshakeRetryConfig};
pub use error::{ClientError, ClientResult, ProtocolError, TransportError};
pub use session::Session;
pub use tool_cache::ToolRegistry;
pub use transport::{CloseReason, Connected, Transport};
