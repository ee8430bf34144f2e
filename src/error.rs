//! Design Decision: Three-layer error taxonomy folding into one sum type
//!
//! Rationale: A host application wants one `Result` type to match against,
//! but the crate has three distinct failure domains - transport-level
//! failures, envelope/content decoding failures, and client-side misuse
//! (calling a method before initialization, asking for a capability the
//! server never advertised). Keeping the domains as separate enums and
//! folding them into `ClientError` at the boundary keeps each layer's
//! errors specific to what actually went wrong at that layer.
//!
//! Trade-offs:
//! - `From` conversions over manual wrapping everywhere: `TransportError`
//!   folds into `ClientError` via `?`, at the cost of the conversion
//!   needing to decide which transport failures deserve their own
//!   top-level variant (auth, session-terminated) versus a generic wrap
//! - String payloads on a few variants: `InvalidArgument` and `Remote`
//!   carry a `String`/`Value` instead of a dedicated enum per failure,
//!   since the set of possible messages isn't fixed ahead of time
//!
//! Alternatives Considered:
//! 1. A single flat error enum for everything: rejected - conflates
//!    transport, wire, and client-misuse failures in one namespace
//! 2. `anyhow::Error` throughout: rejected - callers lose the ability to
//!    match on `CapabilityMissing` or `Timeout` to decide how to recover

use thiserror::Error;

/// Failures originating in a transport (stdio child process, SSE HTTP
/// channel) below the session engine.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("transport closed")]
    Closed,

    #[error("authentication required")]
    AuthRequired,

    #[error("session terminated")]
    SessionTerminated,

    #[error("{0}")]
    Other(String),
}

/// Failures decoding or validating a JSON-RPC envelope or MCP domain value.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unknown content type tag: {0}")]
    UnknownContentTag(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The sum type every public client method returns.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("already connected")]
    AlreadyConnected,

    #[error("not initialized")]
    NotInitialized,

    #[error("capability not available: {0}")]
    CapabilityMissing(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String, data: Option<serde_json::Value> },

    #[error("request timed out")]
    Timeout,

    #[error("authentication required")]
    AuthRequired,

    #[error("session terminated")]
    SessionTerminated,

    #[error("transport closed")]
    TransportClosed,
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::AuthRequired => ClientError::AuthRequired,
            TransportError::SessionTerminated => ClientError::SessionTerminated,
            TransportError::Closed => ClientError::TransportClosed,
            other => ClientError::Transport(other),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
