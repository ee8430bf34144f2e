//! Transport interface: an abstract duplex between the session engine and
//! the wire. Contract (spec): `send` delivers one structured message and
//! may fail synchronously; a lazy sequence of inbound messages is consumed
//! through a channel handed back at connect time; a single-shot future
//! completes when the transport is permanently closed; `close` is
//! idempotent. Outbound sends preserve submission order; inbound delivery
//! preserves wire order.

pub mod sse;
pub mod sse_event;
pub mod stdio;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::TransportError;
use crate::wire::JsonRpcMessage;

/// Why a transport's `on_close` future completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called explicitly.
    Requested,
    /// The peer went away (child process exited, stdout EOF, SSE stream
    /// ended, socket error).
    PeerClosed,
    /// The transport failed in a way that leaves it unusable.
    Error(String),
}

/// Handed back once, at connect time: the live transport plus its inbound
/// message stream and its close future.
pub struct Connected {
    pub transport: Box<dyn Transport>,
    pub inbound: mpsc::UnboundedReceiver<JsonRpcMessage>,
    pub closed: oneshot::Receiver<CloseReason>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one message. Best-effort: may fail synchronously with a
    /// transport error, in which case the caller is responsible for
    /// un-registering whatever pending state it had set up.
    async fn send(&self, message: JsonRpcMessage) -> Result<(), TransportError>;

    /// Idempotent. Triggers the `closed` future handed back in `Connected`
    /// if it hasn't already fired.
    async fn close(&self);
}
