//! Design Decision: Single dispatch task owning the pending-request map
//!
//! Rationale: Multiple in-flight requests need to be correlated with their
//! eventual responses, and notifications need to reach whichever handler is
//! registered for them, all while the transport only hands back a flat
//! stream of classified messages. A single task reading that stream and
//! owning the pending-request map avoids any lock contention between
//! "a response arrived" and "a new request was just registered" - those two
//! mutations happen on the same task instead of racing across tasks.
//!
//! Trade-offs:
//! - Oneshot-per-request vs a shared broadcast channel: one oneshot per
//!   pending request is more allocation but trivially avoids a caller
//!   seeing a response meant for someone else
//! - Timeout removes the pending entry immediately: a late response for a
//!   timed-out id has nowhere to go and is dropped with a warning, not
//!   held onto and not double-completed
//! - Notification handler panics are caught and isolated: one bad handler
//!   must not take down the dispatch loop or the whole session
//!
//! Alternatives Considered:
//! 1. Per-request background task polling a shared map: rejected - adds a
//!    task per in-flight request for no benefit over a single dispatcher
//! 2. Let a panicking handler unwind into the dispatch loop: rejected -
//!    one misbehaving notification handler would end the whole session
//! 3. Keep timed-out entries around to log a late arrival as an error:
//!    rejected - a transport that's simply slow would then look broken

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{ClientError, ClientResult};
use crate::transport::{CloseReason, Transport};
use crate::wire::{JsonRpcMessage, RequestId};

type NotificationHandler = Arc<dyn Fn(Option<Value>) + Send + Sync>;

enum PendingOutcome {
    Success(Value),
    Remote { code: i64, message: String, data: Option<Value> },
    Closed,
}

struct PendingEntry {
    tx: oneshot::Sender<PendingOutcome>,
}

/// Default request timeout (spec: "design default 30 s"). `callToolWithTracking`
/// and other long-running calls may pass a longer value explicitly.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Session {
    request_counter: AtomicU64,
    pending: Mutex<HashMap<RequestId, PendingEntry>>,
    notif_handlers: Mutex<HashMap<String, NotificationHandler>>,
    transport: Arc<dyn Transport>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Wires a freshly connected transport into a running session. Returns
    /// the session and a receiver that fires once, when the transport (or
    /// an explicit `disconnect`) tears the session down — the facade uses
    /// this to flip itself back to `Disconnected`.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        inbound: mpsc::UnboundedReceiver<JsonRpcMessage>,
        closed: oneshot::Receiver<CloseReason>,
    ) -> (Arc<Session>, oneshot::Receiver<CloseReason>) {
        let session = Arc::new(Session {
            request_counter: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            notif_handlers: Mutex::new(HashMap::new()),
            transport,
            dispatch_handle: Mutex::new(None),
        });

        let (torn_down_tx, torn_down_rx) = oneshot::channel();
        let dispatch_session = Arc::clone(&session);
        let handle = tokio::spawn(dispatch_loop(dispatch_session, inbound, closed, torn_down_tx));
        *session.dispatch_handle.lock().unwrap() = Some(handle);

        (session, torn_down_rx)
    }

    /// Allocates the next id, registers a pending completion, hands the
    /// envelope to the transport, and awaits the result within `timeout`.
    pub async fn send_request(&self, method: &str, params: Option<Value>, timeout: Duration) -> ClientResult<Value> {
        let id = RequestId::Number(self.request_counter.fetch_add(1, Ordering::SeqCst) + 1);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id.clone(), PendingEntry { tx });

        // `params` is an owned `Value` moved into the envelope; Rust's
        // ownership model already rules out the caller mutating it
        // concurrently, satisfying the "deep-copied to prevent mutation
        // races" requirement without an explicit clone.
        let message = JsonRpcMessage::request(id.clone(), method, params);
        if let Err(error) = self.transport.send(message).await {
            self.pending.lock().unwrap().remove(&id);
            return Err(error.into());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(PendingOutcome::Success(value))) => Ok(value),
            Ok(Ok(PendingOutcome::Remote { code, message, data })) => Err(ClientError::Remote { code, message, data }),
            Ok(Ok(PendingOutcome::Closed)) => Err(ClientError::TransportClosed),
            Ok(Err(_)) => Err(ClientError::TransportClosed),
            Err(_elapsed) => {
                self.pending.lock().unwrap().remove(&id);
                Err(ClientError::Timeout)
            }
        }
    }

    /// Fire-and-forget: no id, no pending entry, no completion to await.
    pub async fn send_notification(&self, method: &str, params: Option<Value>) -> ClientResult<()> {
        let message = JsonRpcMessage::notification(method, params);
        self.transport.send(message).await.map_err(ClientError::from)
    }

    /// Registers (or replaces) the handler for a notification method.
    pub fn register_handler<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Option<Value>) + Send + Sync + 'static,
    {
        self.notif_handlers.lock().unwrap().insert(method.into(), Arc::new(handler));
    }

    pub async fn disconnect(&self) {
        self.transport.close().await;
        if let Some(handle) = self.dispatch_handle.lock().unwrap().take() {
            let _ = handle.await;
        }
    }
}

async fn dispatch_loop(
    session: Arc<Session>,
    mut inbound: mpsc::UnboundedReceiver<JsonRpcMessage>,
    closed: oneshot::Receiver<CloseReason>,
    torn_down_tx: oneshot::Sender<CloseReason>,
) {
    let mut closed = closed;
    let reason = loop {
        tokio::select! {
            received = inbound.recv() => {
                match received {
                    Some(message) => handle_inbound(&session, message),
                    None => break CloseReason::PeerClosed,
                }
            }
            reason = &mut closed => {
                break reason.unwrap_or(CloseReason::PeerClosed);
            }
        }
    };
    teardown(&session, &reason);
    let _ = torn_down_tx.send(reason);
}

fn handle_inbound(session: &Session, message: JsonRpcMessage) {
    match message {
        JsonRpcMessage::Response { id, result, error } => {
            let entry = session.pending.lock().unwrap().remove(&id);
            match entry {
                Some(entry) => {
                    let outcome = match error {
                        Some(error) => PendingOutcome::Remote { code: error.code, message: error.message, data: error.data },
                        None => PendingOutcome::Success(result.unwrap_or(Value::Null)),
                    };
                    let _ = entry.tx.send(outcome);
                }
                None => tracing::warn!(%id, "response for unknown or already-resolved request id, dropping"),
            }
        }
        JsonRpcMessage::Notification { method, params } => {
            let handler = session.notif_handlers.lock().unwrap().get(&method).cloned();
            match handler {
                Some(handler) => {
                    tracing::debug!(method, "dispatching notification");
                    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(params))).is_err() {
                        tracing::warn!(method, "notification handler panicked; isolated, dispatcher continues");
                    }
                }
                None => tracing::debug!(method, "no handler registered for notification, dropping"),
            }
        }
        JsonRpcMessage::Request { method, .. } => {
            tracing::warn!(method, "ignoring server-originated request, unsupported in this core");
        }
    }
}

fn teardown(session: &Session, reason: &CloseReason) {
    tracing::info!(?reason, "session tearing down, completing all pending requests with TransportClosed");
    let pending = std::mem::take(&mut *session.pending.lock().unwrap());
    for (_, entry) in pending {
        let _ = entry.tx.send(PendingOutcome::Closed);
    }
}
