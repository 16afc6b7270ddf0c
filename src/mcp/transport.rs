#[cfg(unix)]
use std::future::Future;
#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
#[cfg(unix)]
use tokio::net::UnixListener;
#[cfg(unix)]
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{FlStudioMcp, ToolError};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

fn error_response(id: Value, code: i64, message: String) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
    .to_string()
}

/// Handle a single JSON-RPC request line, return response (or None for notifications)
pub async fn handle_jsonrpc_line(line: &str, mcp: &FlStudioMcp) -> Option<String> {
    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            warn!("Unparseable request: {}", e);
            return Some(error_response(
                Value::Null,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            ));
        }
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request
        .get("method")
        .and_then(|m| m.as_str())
        .unwrap_or("");
    let params = request.get("params").cloned().unwrap_or(json!({}));

    if method.starts_with("notifications/") {
        debug!("Notification: {}", method);
        return None;
    }

    let result = match method {
        "initialize" => {
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            })
        }
        "ping" => json!({}),
        "tools/list" => mcp.list_tools(),
        "tools/call" => {
            let tool_name = params
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("");
            let arguments = params
                .get("arguments")
                .filter(|a| !a.is_null())
                .cloned()
                .unwrap_or(json!({}));

            match mcp.handle_tool_call(tool_name, &arguments).await {
                Ok(text) => tool_result(text, false),
                Err(ToolError::UnknownTool(name)) => {
                    warn!("Unknown tool requested: {}", name);
                    return Some(error_response(
                        id,
                        INVALID_PARAMS,
                        format!("Unknown tool: {}", name),
                    ));
                }
                Err(e) => {
                    error!("Error executing tool {}: {}", tool_name, e);
                    tool_result(format!("Error: {}", e), true)
                }
            }
        }
        _ => {
            return Some(error_response(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            ));
        }
    };

    let response = json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    });

    Some(response.to_string())
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": text
        }],
        "isError": is_error
    })
}

/// Serve newline-delimited requests from `reader` until EOF.
/// Requests on one stream are answered strictly in order.
pub async fn serve<R, W>(reader: R, mut writer: W, mcp: &FlStudioMcp) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(response) = handle_jsonrpc_line(line, mcp).await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

/// Serve one client over stdin/stdout
pub async fn run_stdio(mcp: Arc<FlStudioMcp>) -> Result<()> {
    info!("Serving MCP over stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(stdin, stdout, &mcp)
        .await
        .context("stdio transport failed")?;
    info!("stdin closed");
    Ok(())
}

/// Removes the socket file when the server stops, including on cancellation
#[cfg(unix)]
struct SocketFile(PathBuf);

#[cfg(unix)]
impl Drop for SocketFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            debug!("Could not remove socket {}: {}", self.0.display(), e);
        }
    }
}

/// Accept clients on a Unix socket until `shutdown` resolves.
/// Every connection shares the same dispatcher and MIDI session.
///
/// Client tasks are aborted and drained before this returns, so any held
/// note has sent its note off while the session is still connected.
#[cfg(unix)]
pub async fn run_socket<S>(mcp: Arc<FlStudioMcp>, path: &Path, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    // Remove stale socket file
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove stale socket {}", path.display()))?;
    }

    let listener = UnixListener::bind(path)
        .with_context(|| format!("failed to bind {}", path.display()))?;
    let _socket_file = SocketFile(path.to_path_buf());
    info!("Serving MCP on {}", path.display());

    let mut clients = JoinSet::new();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => break Ok(()),
            accepted = listener.accept() => {
                let stream = match accepted.context("failed to accept connection") {
                    Ok((stream, _)) => stream,
                    Err(e) => break Err(e),
                };
                let mcp = mcp.clone();
                clients.spawn(async move {
                    debug!("Client connected");
                    let (read, write) = stream.into_split();
                    if let Err(e) = serve(BufReader::new(read), write, &mcp).await {
                        warn!("Client connection ended with error: {}", e);
                    }
                    debug!("Client disconnected");
                });
            }
            // Reap finished clients so the set does not grow
            Some(_) = clients.join_next(), if !clients.is_empty() => {}
        }
    };

    clients.abort_all();
    while clients.join_next().await.is_some() {}
    debug!("All socket clients stopped");
    result
}
