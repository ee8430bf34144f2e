//! Design Decision: Capability-gated protocol facade over the session engine
//!
//! Rationale: Host applications want a typed method per MCP operation
//! (list_tools, call_tool, read_resource, ...), not a raw send_request call
//! with a method string. This facade owns the handshake state machine and
//! checks each call's required capability before it ever reaches the wire,
//! so a misconfigured or half-negotiated session fails fast and locally.
//!
//! Trade-offs:
//! - One big struct vs per-concern clients: a single `Client` keeps the
//!   phase/capability checks in one place instead of duplicating them
//! - Capability checks are synchronous and local: correct as long as
//!   `server_capabilities` is only ever written once, at handshake
//! - Retry lives here, not in the transport: `connect_with_retry` recycles
//!   the whole transport per attempt, since a half-open transport from a
//!   failed handshake can't be safely reused
//!
//! Alternatives Considered:
//! 1. Push capability checks into the session engine: rejected - the
//!    session has no notion of MCP capabilities, only request/response
//! 2. One client type per transport: rejected - duplicates the whole
//!    method table and capability-gating logic for no real gain
//! 3. Auto-reconnect on teardown: rejected - out of scope, the host decides
//!    whether and how to re-establish a session

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::{json, Value};

use crate::config::{ClientConfig, HandshakeRetryConfig};
use crate::error::{ClientError, ClientResult, ProtocolError};
use crate::session::{Session, DEFAULT_REQUEST_TIMEOUT};
use crate::tool_cache::ToolRegistry;
use crate::transport::{CloseReason, Connected};
use crate::wire::{
    CallToolResult, ClientCapabilities, CreateMessageRequestParams, CreateMessageResult, GetPromptResult, ImplementationInfo,
    InitializeParams, InitializeResult, Prompt, PromptListResult, ReadResourceResult, Resource, ResourceContentInfo, ResourceListResult,
    ResourceTemplate, ResourceTemplateListResult, Root, RootListResult, ServerCapabilities, ServerHealth, Tool, ToolCallTracking,
    ToolListResult, ToolMetadata,
};

/// The only protocol version this core speaks. A server reporting anything
/// else is logged as a warning, not treated as fatal (spec §4.5).
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disconnected,
    Connecting,
    Initialized,
}

struct ClientState {
    phase: Phase,
    session: Option<Arc<Session>>,
    server_capabilities: Option<ServerCapabilities>,
    server_info: Option<ImplementationInfo>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self { phase: Phase::Disconnected, session: None, server_capabilities: None, server_info: None }
    }
}

pub struct Client {
    config: ClientConfig,
    state: Arc<Mutex<ClientState>>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config, state: Arc::new(Mutex::new(ClientState::default())) }
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn server_info(&self) -> Option<ImplementationInfo> {
        self.state.lock().unwrap().server_info.clone()
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.state.lock().unwrap().server_capabilities
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().unwrap().phase == Phase::Initialized
    }

    /// Attaches `transport`, performs the handshake, and on success marks
    /// the client initialized. On any failure the client rolls back to
    /// `Disconnected` — a failed connect never leaves a half-attached
    /// transport around.
    pub async fn connect(&self, transport: Connected) -> ClientResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            match state.phase {
                Phase::Disconnected => state.phase = Phase::Connecting,
                Phase::Connecting => return Err(ClientError::AlreadyConnected),
                Phase::Initialized => return Err(ClientError::AlreadyInitialized),
            }
        }

        let Connected { transport, inbound, closed } = transport;
        let (session, torn_down) = Session::spawn(Arc::from(transport), inbound, closed);
        self.state.lock().unwrap().session = Some(session.clone());
        spawn_teardown_watcher(Arc::clone(&self.state), Arc::clone(&session), torn_down);

        match self.perform_handshake(&session).await {
            Ok((server_info, capabilities)) => {
                let mut state = self.state.lock().unwrap();
                state.server_info = Some(server_info);
                state.server_capabilities = Some(capabilities);
                state.phase = Phase::Initialized;
                Ok(())
            }
            Err(error) => {
                session.disconnect().await;
                let mut state = self.state.lock().unwrap();
                *state = ClientState::default();
                Err(error)
            }
        }
    }

    async fn perform_handshake(&self, session: &Arc<Session>) -> ClientResult<(ImplementationInfo, ServerCapabilities)> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            client_info: ImplementationInfo { name: self.config.name.clone(), version: self.config.version.clone() },
            capabilities: self.config.capabilities,
        };
        let params_value = serde_json::to_value(&params).map_err(ProtocolError::from)?;
        let result_value = session.send_request("initialize", Some(params_value), DEFAULT_REQUEST_TIMEOUT).await?;
        let result: InitializeResult = serde_json::from_value(result_value).map_err(ProtocolError::from)?;

        if result.protocol_version != MCP_PROTOCOL_VERSION {
            log_protocol_version_mismatch(&result.protocol_version);
        }

        session.send_notification("notifications/initialized", None).await?;
        Ok((result.server_info, result.capabilities))
    }

    /// Retries the handshake up to `handshakeRetry.maxAttempts` times with
    /// a fixed delay between attempts; each attempt builds a fresh
    /// transport via `make_transport` and recycles the hook-up entirely.
    pub async fn connect_with_retry<F, Fut>(&self, mut make_transport: F) -> ClientResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Connected, crate::error::TransportError>>,
    {
        let retry: HandshakeRetryConfig = self.config.handshake_retry.clone();
        let attempts = retry.max_attempts.max(1);
        let mut last_error = ClientError::Timeout;

        for attempt in 0..attempts {
            match make_transport().await {
                Ok(connected) => match self.connect(connected).await {
                    Ok(()) => return Ok(()),
                    Err(error) => last_error = error,
                },
                Err(error) => last_error = ClientError::from(error),
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(retry.delay).await;
            }
        }
        Err(last_error)
    }

    pub async fn disconnect(&self) {
        let session = self.state.lock().unwrap().session.clone();
        if let Some(session) = session {
            session.disconnect().await;
        }
        *self.state.lock().unwrap() = ClientState::default();
    }

    fn session_for_capability(&self, select: impl Fn(ServerCapabilities) -> bool, name: &'static str) -> ClientResult<Arc<Session>> {
        let state = self.state.lock().unwrap();
        if state.phase != Phase::Initialized {
            return Err(ClientError::NotInitialized);
        }
        let capabilities = state.server_capabilities.unwrap_or_default();
        if !select(capabilities) {
            return Err(ClientError::CapabilityMissing(name));
        }
        state.session.clone().ok_or(ClientError::NotInitialized)
    }

    fn session_unconditional(&self) -> ClientResult<Arc<Session>> {
        let state = self.state.lock().unwrap();
        if state.phase != Phase::Initialized {
            return Err(ClientError::NotInitialized);
        }
        state.session.clone().ok_or(ClientError::NotInitialized)
    }

    fn client_roots_capability(&self) -> bool {
        self.config.capabilities.roots
    }

    fn client_roots_list_changed(&self) -> bool {
        self.config.capabilities.roots_list_changed
    }

    // ---- tools -----------------------------------------------------

    pub async fn list_tools(&self) -> ClientResult<Vec<Tool>> {
        let session = self.session_for_capability(|c| c.tools, "server.tools")?;
        let value = session.send_request("tools/list", Some(json!({})), DEFAULT_REQUEST_TIMEOUT).await?;
        let result: ToolListResult = serde_json::from_value(value).map_err(ProtocolError::from)?;
        Ok(result.tools)
    }

    /// Issues `tools/list`, populates `registry` with the full tool
    /// records, and returns the projected token-efficient metadata list.
    pub async fn list_tools_metadata(&self, registry: &mut ToolRegistry) -> ClientResult<Vec<ToolMetadata>> {
        let tools = self.list_tools().await?;
        registry.cache_from_tools(tools);
        Ok(registry.get_all_metadata())
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> ClientResult<CallToolResult> {
        require_non_empty(name, "tool name")?;
        let session = self.session_for_capability(|c| c.tools, "server.tools")?;
        let params = json!({"name": name, "arguments": arguments});
        let value = session.send_request("tools/call", Some(params), DEFAULT_REQUEST_TIMEOUT).await?;
        serde_json::from_value(value).map_err(|error| ClientError::Protocol(ProtocolError::from(error)))
    }

    /// Like [`Self::call_tool`] but requests server-side progress tracking
    /// and surfaces the resulting `operationId`, when the server grants
    /// one. Long-running tracked operations may warrant a longer timeout
    /// than the session default; pass one explicitly.
    pub async fn call_tool_with_tracking(&self, name: &str, arguments: Value, timeout: Duration) -> ClientResult<ToolCallTracking> {
        require_non_empty(name, "tool name")?;
        let session = self.session_for_capability(|c| c.tools, "server.tools")?;
        let params = json!({"name": name, "arguments": arguments, "trackProgress": true});
        let value = session.send_request("tools/call", Some(params), timeout).await?;
        serde_json::from_value(value).map_err(|error| ClientError::Protocol(ProtocolError::from(error)))
    }

    // ---- resources ---------------------------------------------------

    pub async fn list_resources(&self) -> ClientResult<Vec<Resource>> {
        let session = self.session_for_capability(|c| c.resources, "server.resources")?;
        let value = session.send_request("resources/list", Some(json!({})), DEFAULT_REQUEST_TIMEOUT).await?;
        let result: ResourceListResult = serde_json::from_value(value).map_err(ProtocolError::from)?;
        Ok(result.resources)
    }

    pub async fn list_resource_templates(&self) -> ClientResult<Vec<ResourceTemplate>> {
        let session = self.session_for_capability(|c| c.resources, "server.resources")?;
        let value = session.send_request("resources/templates/list", Some(json!({})), DEFAULT_REQUEST_TIMEOUT).await?;
        let result: ResourceTemplateListResult = serde_json::from_value(value).map_err(ProtocolError::from)?;
        Ok(result.resource_templates)
    }

    pub async fn read_resource(&self, uri: &str) -> ClientResult<ReadResourceResult> {
        let session = self.session_for_capability(|c| c.resources, "server.resources")?;
        let value = session.send_request("resources/read", Some(json!({"uri": uri})), DEFAULT_REQUEST_TIMEOUT).await?;
        serde_json::from_value(value).map_err(|error| ClientError::Protocol(ProtocolError::from(error)))
    }

    /// Performs client-side `{key}` → percent-encoded-value substitution
    /// against `templateUri`, then delegates to `resources/read`. Rejects
    /// a template that still has an unresolved `{key}` placeholder after
    /// substitution, so a caller's missing parameter fails locally instead
    /// of as a confusing server-side "resource not found".
    pub async fn get_resource_with_template(&self, template_uri: &str, params: &HashMap<String, String>) -> ClientResult<ReadResourceResult> {
        let uri = substitute_uri_template(template_uri, params);
        if uri.contains('{') {
            return Err(ClientError::InvalidArgument(format!("unresolved placeholder in URI template: {uri}")));
        }
        self.read_resource(&uri).await
    }

    pub async fn subscribe_resource(&self, uri: &str) -> ClientResult<()> {
        let session = self.session_for_capability(|c| c.resources, "server.resources")?;
        session.send_request("resources/subscribe", Some(json!({"uri": uri})), DEFAULT_REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn unsubscribe_resource(&self, uri: &str) -> ClientResult<()> {
        let session = self.session_for_capability(|c| c.resources, "server.resources")?;
        session.send_request("resources/unsubscribe", Some(json!({"uri": uri})), DEFAULT_REQUEST_TIMEOUT).await?;
        Ok(())
    }

    // ---- prompts -------------------------------------------------------

    pub async fn list_prompts(&self) -> ClientResult<Vec<Prompt>> {
        let session = self.session_for_capability(|c| c.prompts, "server.prompts")?;
        let value = session.send_request("prompts/list", Some(json!({})), DEFAULT_REQUEST_TIMEOUT).await?;
        let result: PromptListResult = serde_json::from_value(value).map_err(ProtocolError::from)?;
        Ok(result.prompts)
    }

    pub async fn get_prompt(&self, name: &str, arguments: Option<Value>) -> ClientResult<GetPromptResult> {
        let session = self.session_for_capability(|c| c.prompts, "server.prompts")?;
        let mut params = json!({"name": name});
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        let value = session.send_request("prompts/get", Some(params), DEFAULT_REQUEST_TIMEOUT).await?;
        serde_json::from_value(value).map_err(|error| ClientError::Protocol(ProtocolError::from(error)))
    }

    // ---- sampling ------------------------------------------------------

    pub async fn create_message(&self, request: CreateMessageRequestParams) -> ClientResult<CreateMessageResult> {
        let session = self.session_for_capability(|c| c.sampling, "server.sampling")?;
        let params = serde_json::to_value(request).map_err(ProtocolError::from)?;
        let value = session.send_request("sampling/createMessage", Some(params), DEFAULT_REQUEST_TIMEOUT).await?;
        serde_json::from_value(value).map_err(|error| ClientError::Protocol(ProtocolError::from(error)))
    }

    // ---- roots ---------------------------------------------------------

    pub async fn add_root(&self, root: Root) -> ClientResult<()> {
        if !self.client_roots_capability() {
            return Err(ClientError::CapabilityMissing("client.roots"));
        }
        let session = self.session_unconditional()?;
        let params = json!({"root": root});
        session.send_request("roots/add", Some(params), DEFAULT_REQUEST_TIMEOUT).await?;
        if self.client_roots_list_changed() {
            session.send_notification("notifications/roots/list_changed", None).await?;
        }
        Ok(())
    }

    pub async fn remove_root(&self, uri: &str) -> ClientResult<()> {
        if !self.client_roots_capability() {
            return Err(ClientError::CapabilityMissing("client.roots"));
        }
        let session = self.session_unconditional()?;
        session.send_request("roots/remove", Some(json!({"uri": uri})), DEFAULT_REQUEST_TIMEOUT).await?;
        if self.client_roots_list_changed() {
            session.send_notification("notifications/roots/list_changed", None).await?;
        }
        Ok(())
    }

    pub async fn list_roots(&self) -> ClientResult<Vec<Root>> {
        if !self.client_roots_capability() {
            return Err(ClientError::CapabilityMissing("client.roots"));
        }
        let session = self.session_unconditional()?;
        let value = session.send_request("roots/list", Some(json!({})), DEFAULT_REQUEST_TIMEOUT).await?;
        let result: RootListResult = serde_json::from_value(value).map_err(ProtocolError::from)?;
        Ok(result.roots)
    }

    // ---- ungated: health / logging / cancel -----------------------------

    pub async fn health_check(&self) -> ClientResult<ServerHealth> {
        let session = self.session_unconditional()?;
        let value = session.send_request("health/check", Some(json!({})), DEFAULT_REQUEST_TIMEOUT).await?;
        serde_json::from_value(value).map_err(|error| ClientError::Protocol(ProtocolError::from(error)))
    }

    pub async fn set_logging_level(&self, level: i64) -> ClientResult<()> {
        let session = self.session_unconditional()?;
        session.send_request("logging/set_level", Some(json!({"level": level})), DEFAULT_REQUEST_TIMEOUT).await?;
        Ok(())
    }

    /// Requests cancellation of a previously started operation. This does
    /// not complete the original `tools/call` locally; that call still
    /// depends on the server's eventual response or its own timeout.
    pub async fn cancel_operation(&self, operation_id: &str) -> ClientResult<()> {
        let session = self.session_unconditional()?;
        session.send_request("cancel", Some(json!({"id": operation_id})), DEFAULT_REQUEST_TIMEOUT).await?;
        Ok(())
    }

    // ---- notification registration -------------------------------------

    pub fn on_tools_list_changed(&self, handler: impl Fn() + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("notifications/tools/list_changed", move |_| handler());
        Ok(())
    }

    pub fn on_resources_list_changed(&self, handler: impl Fn() + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("notifications/resources/list_changed", move |_| handler());
        Ok(())
    }

    pub fn on_prompts_list_changed(&self, handler: impl Fn() + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("notifications/prompts/list_changed", move |_| handler());
        Ok(())
    }

    pub fn on_roots_list_changed(&self, handler: impl Fn() + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("notifications/roots/list_changed", move |_| handler());
        Ok(())
    }

    pub fn on_resources_updated(&self, handler: impl Fn(ResourceUpdated) + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("notifications/resources/updated", move |params| {
            match params.and_then(|value| serde_json::from_value::<ResourceUpdated>(value).ok()) {
                Some(update) => handler(update),
                None => tracing::warn!("dropping malformed resources/updated notification"),
            }
        });
        Ok(())
    }

    pub fn on_progress(&self, handler: impl Fn(Progress) + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("progress", move |params| {
            match params.and_then(|value| serde_json::from_value::<Progress>(value).ok()) {
                Some(progress) => handler(progress),
                None => tracing::warn!("dropping malformed progress notification"),
            }
        });
        Ok(())
    }

    pub fn on_sampling_response(&self, handler: impl Fn(SamplingResponse) + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("sampling/response", move |params| {
            match params.and_then(|value| serde_json::from_value::<SamplingResponse>(value).ok()) {
                Some(response) => handler(response),
                None => tracing::warn!("dropping malformed sampling/response notification"),
            }
        });
        Ok(())
    }

    pub fn on_logging(&self, handler: impl Fn(LoggingNotification) + Send + Sync + 'static) -> ClientResult<()> {
        self.session_unconditional()?.register_handler("logging", move |params| {
            match params.and_then(|value| serde_json::from_value::<LoggingNotification>(value).ok()) {
                Some(entry) => handler(entry),
                None => tracing::warn!("dropping malformed logging notification"),
            }
        });
        Ok(())
    }
}

/// Resets `state` to `Disconnected` once `torn_down` fires, but only if
/// `state` is still pointing at the same session — a later `connect()`
/// replacing it first must not have its fresh state clobbered by a stale
/// watcher from the previous connection.
fn spawn_teardown_watcher(state: Arc<Mutex<ClientState>>, session: Arc<Session>, torn_down: tokio::sync::oneshot::Receiver<CloseReason>) {
    tokio::spawn(async move {
        let reason = torn_down.await.unwrap_or(CloseReason::PeerClosed);
        tracing::debug!(?reason, "session torn down, resetting client state");
        let mut guard = state.lock().unwrap();
        let still_current = guard.session.as_ref().map(|current| Arc::ptr_eq(current, &session)).unwrap_or(false);
        if still_current {
            *guard = ClientState::default();
        }
    });
}

fn log_protocol_version_mismatch(reported: &str) {
    use chrono_free_date_compare::compare_iso_dates;
    match compare_iso_dates(reported, MCP_PROTOCOL_VERSION) {
        Some(std::cmp::Ordering::Greater) => {
            tracing::warn!(reported, expected = MCP_PROTOCOL_VERSION, "server reports a newer protocol version than this core supports");
        }
        Some(std::cmp::Ordering::Less) => {
            tracing::warn!(reported, expected = MCP_PROTOCOL_VERSION, "server reports an older protocol version than this core supports");
        }
        _ => {
            tracing::warn!(reported, expected = MCP_PROTOCOL_VERSION, "server reports an unexpected protocol version");
        }
    }
}

/// Bare ISO `YYYY-MM-DD` comparison, with no calendar library pulled in for
/// what is an advisory log line, not a control-flow decision.
mod chrono_free_date_compare {
    pub fn compare_iso_dates(a: &str, b: &str) -> Option<std::cmp::Ordering> {
        let parse = |s: &str| -> Option<(u32, u32, u32)> {
            let mut parts = s.splitn(3, '-');
            let year: u32 = parts.next()?.parse().ok()?;
            let month: u32 = parts.next()?.parse().ok()?;
            let day: u32 = parts.next()?.parse().ok()?;
            Some((year, month, day))
        };
        Some(parse(a)?.cmp(&parse(b)?))
    }
}

fn require_non_empty(value: &str, what: &'static str) -> ClientResult<()> {
    if value.trim().is_empty() {
        return Err(ClientError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

fn substitute_uri_template(template: &str, params: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            result.push_str(rest);
            return result;
        };
        let end = start + end;
        result.push_str(&rest[..start]);
        let key = &rest[start + 1..end];
        match params.get(key) {
            Some(value) => result.push_str(&utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()),
            None => {
                result.push('{');
                result.push_str(key);
                result.push('}');
            }
        }
        rest = &rest[end + 1..];
    }
    result.push_str(rest);
    result
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ResourceUpdated {
    pub uri: String,
    pub content: Option<ResourceContentInfo>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Progress {
    #[serde(alias = "requestId", alias = "request_id")]
    pub request_id: Value,
    pub progress: f64,
    pub message: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SamplingResponse {
    #[serde(alias = "requestId", alias = "request_id")]
    pub request_id: Value,
    pub result: CreateMessageResult,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoggingNotification {
    pub level: i64,
    pub message: String,
    pub logger: Option<String>,
    pub data: Option<Value>,
}

#[derive(Default)]
pub struct ClientBuilder {
    name: Option<String>,
    version: Option<String>,
    capabilities: ClientCapabilities,
    handshake_retry: HandshakeRetryConfig,
}

impl ClientBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn handshake_retry(mut self, retry: HandshakeRetryConfig) -> Self {
        self.handshake_retry = retry;
        self
    }

    pub fn build(self) -> Client {
        Client::new(ClientConfig {
            name: self.name.unwrap_or_else(|| "mcp-client-core".to_string()),
            version: self.version.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            capabilities: self.capabilities,
            handshake_retry: self.handshake_retry,
        })
    }
}
