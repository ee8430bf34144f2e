//! End-to-end scenarios driven through `Client` against a scripted
//! in-memory transport — no real subprocess or network involved.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use mcp_client_core::client::Client;
use mcp_client_core::config::ClientConfig;
use mcp_client_core::error::ClientError;
use mcp_client_core::transport::{CloseReason, Connected, Transport};
use mcp_client_core::wire::{ClientCapabilities, JsonRpcMessage, RequestId};

struct ScriptedTransport {
    sent: Arc<StdMutex<Vec<JsonRpcMessage>>>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, message: JsonRpcMessage) -> Result<(), mcp_client_core::error::TransportError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn close(&self) {}
}

struct Harness {
    client: Arc<Client>,
    inbound_tx: mpsc::UnboundedSender<JsonRpcMessage>,
    sent: Arc<StdMutex<Vec<JsonRpcMessage>>>,
    // Kept alive for the harness's lifetime: dropping it would fire the
    // session's close signal and tear the dispatch loop down mid-scenario.
    _closed_tx: oneshot::Sender<CloseReason>,
}

fn default_config() -> ClientConfig {
    ClientConfig {
        name: "test-host".to_string(),
        version: "0.0.0".to_string(),
        capabilities: ClientCapabilities { roots: true, roots_list_changed: true, sampling: true },
        handshake_retry: Default::default(),
    }
}

/// Spawns a client and connects it, responding to `initialize` with
/// `server_capabilities`. Returns the harness with the connect future
/// already resolved.
async fn connect_with_capabilities(server_capabilities: serde_json::Value) -> Harness {
    let sent = Arc::new(StdMutex::new(Vec::new()));
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = oneshot::channel::<CloseReason>();

    let client = Arc::new(Client::new(default_config()));
    let connected = Connected { transport: Box::new(ScriptedTransport { sent: sent.clone() }), inbound: inbound_rx, closed: closed_rx };

    let connect_client = client.clone();
    let connect_handle = tokio::spawn(async move { connect_client.connect(connected).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    inbound_tx
        .send(JsonRpcMessage::Response {
            id: RequestId::Number(1),
            result: Some(json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {"name": "scripted-server", "version": "1.0.0"},
                "capabilities": server_capabilities,
            })),
            error: None,
        })
        .unwrap();

    connect_handle.await.unwrap().expect("handshake should succeed");

    Harness { client, inbound_tx, sent, _closed_tx: closed_tx }
}

fn next_request_id(sent: &StdMutex<Vec<JsonRpcMessage>>) -> RequestId {
    match sent.lock().unwrap().last() {
        Some(JsonRpcMessage::Request { id, .. }) => id.clone(),
        other => panic!("expected the last sent message to be a request, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_initialization_populates_server_state_and_sends_initialized() {
    let harness = connect_with_capabilities(json!({"tools": {"listChanged": true}})).await;
    assert!(harness.client.is_initialized());
    assert_eq!(harness.client.server_info().unwrap().name, "scripted-server");
    assert!(harness.client.server_capabilities().unwrap().tools);

    let sent = harness.sent.lock().unwrap();
    assert!(matches!(sent.last(), Some(JsonRpcMessage::Notification { method, .. }) if method == "notifications/initialized"));
}

#[tokio::test]
async fn scenario_list_then_call_tool_round_trips() {
    let harness = connect_with_capabilities(json!({"tools": {}})).await;

    let list_handle = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.list_tools().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let id = next_request_id(&harness.sent);
    harness
        .inbound_tx
        .send(JsonRpcMessage::Response {
            id,
            result: Some(json!({"tools": [{"name": "calculator", "description": "adds numbers", "inputSchema": {"type": "object"}}]})),
            error: None,
        })
        .unwrap();
    let tools = list_handle.await.unwrap().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "calculator");

    let call_handle = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.call_tool("calculator", json!({"a": 1, "b": 2})).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let id = next_request_id(&harness.sent);
    harness
        .inbound_tx
        .send(JsonRpcMessage::Response {
            id,
            result: Some(json!({"content": [{"type": "text", "text": "3"}], "isStreaming": false})),
            error: None,
        })
        .unwrap();
    let result = call_handle.await.unwrap().unwrap();
    assert_eq!(result.content.len(), 1);
}

#[tokio::test]
async fn scenario_remote_error_surfaces_as_client_error_remote() {
    let harness = connect_with_capabilities(json!({"tools": {}})).await;

    let call_handle = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.call_tool("unknown-tool", json!({})).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let id = next_request_id(&harness.sent);
    harness
        .inbound_tx
        .send(JsonRpcMessage::Response {
            id,
            result: None,
            error: Some(mcp_client_core::wire::JsonRpcErrorObject { code: -32602, message: "Tool not found: unknown-tool".to_string(), data: None }),
        })
        .unwrap();

    match call_handle.await.unwrap() {
        Err(ClientError::Remote { code, message, .. }) => {
            assert_eq!(code, -32602);
            assert!(message.contains("unknown-tool"));
        }
        other => panic!("expected ClientError::Remote, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_notification_fan_out_to_registered_handler() {
    let harness = connect_with_capabilities(json!({"tools": {"listChanged": true}})).await;
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_handle = fired.clone();
    harness.client.on_tools_list_changed(move || { fired_handle.fetch_add(1, Ordering::SeqCst); }).unwrap();

    harness.inbound_tx.send(JsonRpcMessage::Notification { method: "notifications/tools/list_changed".to_string(), params: None }).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scenario_capability_violation_rejects_before_touching_the_wire() {
    let harness = connect_with_capabilities(json!({})).await;
    let sent_before = harness.sent.lock().unwrap().len();

    let result = harness.client.list_tools().await;
    assert!(matches!(result, Err(ClientError::CapabilityMissing("server.tools"))));
    assert_eq!(harness.sent.lock().unwrap().len(), sent_before, "a capability-gated call must never reach the transport");
}

#[tokio::test]
async fn scenario_metadata_projection_is_smaller_than_full_tool_list() {
    use mcp_client_core::tool_cache::ToolRegistry;

    let harness = connect_with_capabilities(json!({"tools": {}})).await;
    let wide_schema = json!({
        "type": "object",
        "properties": {
            "a": {"type": "string", "description": "first operand, a long description to pad the schema out"},
            "b": {"type": "string", "description": "second operand, a long description to pad the schema out"},
            "c": {"type": "string", "description": "third operand, a long description to pad the schema out"},
        },
        "required": ["a", "b", "c"],
    });

    let list_handle = {
        let client = harness.client.clone();
        tokio::spawn(async move {
            let mut registry = ToolRegistry::new();
            client.list_tools_metadata(&mut registry).await.map(|metadata| (metadata, registry.count()))
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let id = next_request_id(&harness.sent);
    harness
        .inbound_tx
        .send(JsonRpcMessage::Response {
            id,
            result: Some(json!({"tools": [{"name": "calculator", "description": "adds numbers", "inputSchema": wide_schema}]})),
            error: None,
        })
        .unwrap();

    let (metadata, count) = list_handle.await.unwrap().unwrap();
    assert_eq!(count, 1);
    let full_size = serde_json::to_string(&json!({"name": "calculator", "description": "adds numbers", "inputSchema": wide_schema})).unwrap().len();
    let metadata_size = serde_json::to_string(&metadata[0]).unwrap().len();
    assert!(metadata_size * 2 <= full_size, "metadata encoding ({metadata_size}) must be at most half the full tool encoding ({full_size})");
}
