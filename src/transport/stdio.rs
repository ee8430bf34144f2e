//! Design Decision: Process-based stdio transport for local MCP servers
//!
//! Rationale: Local MCP servers communicate over stdin/stdout using
//! newline-delimited JSON-RPC messages. A spawned child process with piped
//! stdio matches how local tool servers are actually run, with stderr
//! forwarded separately as diagnostics rather than parsed as protocol.
//!
//! Trade-offs:
//! - Single writer task draining a FIFO queue: guarantees submission-order
//!   delivery without the caller needing its own mutex around writes
//! - Yield between sends: lets the OS actually flush one line before the
//!   next write lands, at the cost of a small scheduling delay per send
//! - Non-fatal parse errors: a line that doesn't parse is logged and
//!   skipped rather than tearing down the whole session, since a single
//!   malformed line shouldn't be fatal to an otherwise healthy child
//! - kill_on_drop: the child process is tied to the transport's lifetime,
//!   so a dropped transport can't leak a running server process
//!
//! Alternatives Considered:
//! 1. Synchronous blocking I/O on a dedicated OS thread: rejected - mixes
//!    poorly with the rest of the crate's tokio-based concurrency
//! 2. Parse stderr as structured output too: rejected - stderr carries
//!    arbitrary diagnostic text, not JSON-RPC, by MCP convention
//! 3. Fail the whole session on the first unparsable line: rejected - too
//!    brittle against a server that occasionally logs to stdout

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::error::TransportError;
use crate::wire::JsonRpcMessage;

use super::{CloseReason, Connected, Transport};

#[derive(Debug, Clone, Deserialize)]
pub struct StdioTransportConfig {
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(rename = "workingDirectory", default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

pub struct StdioTransport {
    outbound_tx: mpsc::UnboundedSender<JsonRpcMessage>,
    child: Arc<Mutex<Child>>,
    closed_tx: Arc<Mutex<Option<oneshot::Sender<CloseReason>>>>,
}

fn fire_close(closed_tx: &Arc<Mutex<Option<oneshot::Sender<CloseReason>>>>, reason: CloseReason) {
    if let Some(tx) = closed_tx.lock().unwrap().take() {
        let _ = tx.send(reason);
    }
}

impl StdioTransport {
    pub async fn connect(config: StdioTransportConfig) -> Result<Connected, TransportError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_directory {
            cmd.current_dir(dir);
        }
        for (key, value) in &config.environment {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| TransportError::Other("child has no stdin".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| TransportError::Other("child has no stdout".to_string()))?;
        let stderr = child.stderr.take().ok_or_else(|| TransportError::Other("child has no stderr".to_string()))?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<JsonRpcMessage>();
        let (closed_tx_raw, closed_rx) = oneshot::channel();
        let closed_tx = Arc::new(Mutex::new(Some(closed_tx_raw)));
        let child = Arc::new(Mutex::new(child));

        tokio::spawn(writer_loop(stdin, outbound_rx));
        tokio::spawn(reader_loop(stdout, inbound_tx, child.clone(), closed_tx.clone()));
        tokio::spawn(stderr_loop(stderr));

        let transport = StdioTransport { outbound_tx, child, closed_tx };
        Ok(Connected { transport: Box::new(transport), inbound: inbound_rx, closed: closed_rx })
    }
}

async fn writer_loop(mut stdin: tokio::process::ChildStdin, mut outbound_rx: mpsc::UnboundedReceiver<JsonRpcMessage>) {
    while let Some(message) = outbound_rx.recv().await {
        let line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(error) => {
                tracing::warn!(%error, "failed to encode outbound message, dropping");
                continue;
            }
        };
        if let Err(error) = stdin.write_all(line.as_bytes()).await {
            tracing::warn!(%error, "stdin write failed, stopping writer");
            break;
        }
        if let Err(error) = stdin.write_all(b"\n").await {
            tracing::warn!(%error, "stdin write failed, stopping writer");
            break;
        }
        if let Err(error) = stdin.flush().await {
            tracing::warn!(%error, "stdin flush failed, stopping writer");
            break;
        }
        // Yield so a single sender can't starve the rest of the runtime
        // between lines; lets the OS actually flush before the next write.
        tokio::task::yield_now().await;
    }
}

async fn reader_loop(
    stdout: tokio::process::ChildStdout,
    inbound_tx: mpsc::UnboundedSender<JsonRpcMessage>,
    child: Arc<Mutex<Child>>,
    closed_tx: Arc<Mutex<Option<oneshot::Sender<CloseReason>>>>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match JsonRpcMessage::from_slice(line.as_bytes()) {
                    Ok(message) => {
                        if inbound_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, line, "skipping unparsable stdout line");
                    }
                }
            }
            Ok(None) => {
                tracing::info!("child stdout reached EOF");
                break;
            }
            Err(error) => {
                tracing::warn!(%error, "stdout read failed");
                break;
            }
        }
    }
    let _ = child.lock().unwrap().start_kill();
    fire_close(&closed_tx, CloseReason::PeerClosed);
}

async fn stderr_loop(stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!(target: "mcp_client_core::stdio::stderr", "{line}");
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, message: JsonRpcMessage) -> Result<(), TransportError> {
        self.outbound_tx.send(message).map_err(|_| TransportError::Closed)
    }

    async fn close(&self) {
        let _ = self.child.lock().unwrap().start_kill();
        fire_close(&self.closed_tx, CloseReason::Requested);
    }
}
