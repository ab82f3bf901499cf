//! MCP server - stdio transport
//!
//! Requests are read line by line. Each `tools/call` runs on its own task so
//! several calls can be in flight; all frames go out through a single writer
//! task so lines never interleave.

use std::io;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use glean_client::ChatProvider;
use glean_config::ChatDefaults;
use glean_observability::request_span;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::protocol::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RpcError, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools::{ChatTool, ProgressFn, ToolError};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "mcp-glean";

type FrameSender = mpsc::UnboundedSender<String>;

/// MCP server exposing the `chat` tool
pub struct McpServer {
    chat: Arc<ChatTool>,
    /// Cancellation handles of in-flight calls, keyed by serialized request id
    in_flight: Arc<DashMap<String, CancellationToken>>,
}

impl McpServer {
    pub fn new(provider: Arc<dyn ChatProvider>, defaults: ChatDefaults) -> Self {
        Self {
            chat: Arc::new(ChatTool::new(provider, defaults)),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Serve on the process stdin/stdout until stdin closes
    pub async fn run_stdio(&self) -> io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        tracing::info!("Glean MCP server listening on stdio");
        self.serve(stdin, tokio::io::stdout()).await?;
        tracing::info!("stdin closed, Glean MCP server stopped");
        Ok(())
    }

    /// Serve until `reader` reaches EOF, then wait for in-flight calls and
    /// hand the writer back.
    ///
    /// A read error ends the loop the same way and is returned once
    /// in-flight calls have been answered.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> io::Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_frames(rx, writer));
        let tracker = TaskTracker::new();

        let mut buf = Vec::new();
        let read_error = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break None,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Failed to read from input: {}", e);
                    break Some(e);
                }
            }

            match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        self.handle_line(line, &tx, &tracker);
                    }
                }
                Err(e) => {
                    tracing::warn!("Frame is not valid UTF-8: {}", e);
                    let error = RpcError::new(PARSE_ERROR, format!("Parse error: {}", e));
                    send_frame(&tx, &JsonRpcResponse::error(Value::Null, error));
                }
            }
        };

        tracker.close();
        tracker.wait().await;
        drop(tx);

        let writer = writer_task
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        match read_error {
            Some(e) => Err(e),
            None => Ok(writer),
        }
    }

    fn handle_line(&self, line: &str, tx: &FrameSender, tracker: &TaskTracker) {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Unparsable frame: {}", e);
                let error = RpcError::new(PARSE_ERROR, format!("Parse error: {}", e));
                send_frame(tx, &JsonRpcResponse::error(Value::Null, error));
                return;
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                let error = RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e));
                send_frame(tx, &JsonRpcResponse::error(id, error));
                return;
            }
        };

        if request.jsonrpc != "2.0" {
            let error = RpcError::new(
                INVALID_REQUEST,
                format!("Invalid JSON-RPC version: expected 2.0, got {}", request.jsonrpc),
            );
            send_frame(tx, &JsonRpcResponse::error(id, error));
            return;
        }

        tracing::debug!(method = %request.method, "Received request");
        self.dispatch(request, tx, tracker);
    }

    fn dispatch(&self, request: JsonRpcRequest, tx: &FrameSender, tracker: &TaskTracker) {
        if request.method == "notifications/cancelled" {
            self.cancel(&request.params);
            return;
        }
        let Some(id) = request.id.clone() else {
            // Other notifications, including `notifications/initialized`, need no reply
            return;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": [ChatTool::definition()] })),
            "tools/call" => {
                self.spawn_tool_call(id, request.params, tx, tracker);
                return;
            }
            other => JsonRpcResponse::error(
                id,
                RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other)),
            ),
        };
        send_frame(tx, &response);
    }

    fn spawn_tool_call(&self, id: Value, params: Value, tx: &FrameSender, tracker: &TaskTracker) {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        if name != ChatTool::NAME {
            let error = RpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", name));
            send_frame(tx, &JsonRpcResponse::error(id, error));
            return;
        }

        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let progress = params
            .get("_meta")
            .and_then(|meta| meta.get("progressToken"))
            .cloned()
            .map(|token| progress_reporter(token, tx.clone()));

        let key = id.to_string();
        let token = CancellationToken::new();
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                let error = RpcError::new(
                    INVALID_REQUEST,
                    format!("Request id {} is already in flight", key),
                );
                send_frame(tx, &JsonRpcResponse::error(id, error));
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
            }
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let span = request_span(&request_id, ChatTool::NAME);
        let chat = Arc::clone(&self.chat);
        let in_flight = Arc::clone(&self.in_flight);
        let tx = tx.clone();

        tracker.spawn(
            async move {
                tracing::info!("Chat tool invoked");
                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ToolError::Cancelled),
                    result = chat.call(arguments, progress) => result,
                };
                in_flight.remove(&key);

                let response = match outcome {
                    Ok(output) => {
                        tracing::info!("Chat tool completed");
                        JsonRpcResponse::success(id, output.into_result())
                    }
                    Err(e) => {
                        tracing::warn!(code = e.code(), "Chat tool failed: {}", e);
                        JsonRpcResponse::error(id, e.to_rpc())
                    }
                };
                send_frame(&tx, &response);
            }
            .instrument(span),
        );
    }

    fn cancel(&self, params: &Value) {
        let Some(request_id) = params.get("requestId") else {
            return;
        };
        match self.in_flight.get(&request_id.to_string()) {
            Some(token) => {
                let reason = params.get("reason").and_then(Value::as_str).unwrap_or("none given");
                tracing::info!(request_id = %request_id, "Cancelling in-flight call: {}", reason);
                token.cancel();
            }
            None => tracing::debug!(request_id = %request_id, "Cancel for unknown or finished request"),
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn progress_reporter(token: Value, tx: FrameSender) -> ProgressFn {
    Box::new(move |step, message| {
        send_frame(&tx, &JsonRpcNotification::progress(token.clone(), step, message));
    })
}

fn send_frame<T: Serialize>(tx: &FrameSender, frame: &T) {
    match serde_json::to_string(frame) {
        Ok(line) => {
            if tx.send(line).is_err() {
                tracing::warn!("Output closed, dropping frame");
            }
        }
        Err(e) => tracing::error!("Failed to serialize frame: {}", e),
    }
}

async fn write_frames<W>(mut rx: mpsc::UnboundedReceiver<String>, mut writer: W) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(writer)
}
