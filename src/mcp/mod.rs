// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

pub mod schema;
pub mod tools;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::constants::errors::{
    ERROR_INTERNAL_ERROR, ERROR_INVALID_PARAMS, ERROR_INVALID_REQUEST, ERROR_METHOD_NOT_FOUND,
    ERROR_PARSE,
};
use crate::constants::protocol::{
    JSONRPC_VERSION, MCP_PROTOCOL_VERSION, SERVER_NAME, SERVER_TITLE, SERVER_VERSION,
};
use crate::mcp::schema::{
    get_resource_templates, get_tools, InitializeResponse, ResourceContents, GREETING_URI_PREFIX,
};
use crate::mcp::tools::ToolCall;
use crate::session::SessionState;

/// MCP server over newline-delimited JSON-RPC. The Garmin Connect session is
/// injected once and shared read-only by every request.
#[derive(Clone)]
pub struct McpServer {
    session: SessionState,
}

impl McpServer {
    pub fn new(session: SessionState) -> Self {
        Self { session }
    }

    /// Serve a single client on stdin/stdout
    pub async fn run_stdio(self) -> Result<()> {
        info!("MCP server listening on stdio");
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve clients connecting to `127.0.0.1:port`, one task per connection
    pub async fn run_tcp(self, port: u16) -> Result<()> {
        let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
        info!("MCP server listening on port {}", port);

        let server = Arc::new(self);
        loop {
            let (socket, addr) = listener.accept().await?;
            info!("New connection from {}", addr);

            let server = server.clone();
            tokio::spawn(async move {
                let (reader, writer) = socket.into_split();
                if let Err(e) = server.serve(BufReader::new(reader), writer).await {
                    warn!("Connection from {} closed with error: {}", addr, e);
                }
            });
        }
    }

    /// Read requests line by line until EOF, writing one response line per
    /// request (notifications get none)
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    /// Handle one raw JSON-RPC message
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => Some(McpResponse::error(
                Value::Null,
                ERROR_PARSE,
                format!("Parse error: {e}"),
            )),
            Ok(value) => match serde_json::from_value::<McpRequest>(value) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => Some(McpResponse::error(
                    Value::Null,
                    ERROR_INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                )),
            },
        }?;

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to serialize response: {}", e);
                None
            }
        }
    }

    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };
        let params = request.params.unwrap_or_else(|| json!({}));

        let response = match request.method.as_str() {
            "initialize" => {
                let init_response = InitializeResponse::new(
                    MCP_PROTOCOL_VERSION.to_string(),
                    SERVER_NAME.to_string(),
                    SERVER_VERSION.to_string(),
                )
                .with_instructions(SERVER_TITLE);
                McpResponse::serialized(id, &init_response)
            }
            "ping" => McpResponse::result(id, json!({})),
            "tools/list" => McpResponse::result(id, json!({ "tools": get_tools() })),
            "tools/call" => self.handle_tool_call(id, &params).await,
            "resources/list" => McpResponse::result(id, json!({ "resources": [] })),
            "resources/templates/list" => McpResponse::result(
                id,
                json!({ "resourceTemplates": get_resource_templates() }),
            ),
            "resources/read" => handle_resource_read(id, &params),
            _ => McpResponse::error(id, ERROR_METHOD_NOT_FOUND, "Method not found"),
        };
        Some(response)
    }

    async fn handle_tool_call(&self, id: Value, params: &Value) -> McpResponse {
        let tool_name = params["name"].as_str().unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let call = match ToolCall::parse(tool_name, &args) {
            Ok(call) => call,
            Err(e) => return McpResponse::error(id, e.code(), e.to_string()),
        };

        let started = Instant::now();
        let outcome = call.execute(&self.session).await;
        info!(
            mcp.tool = %call.name(),
            mcp.success = outcome.is_ok(),
            mcp.duration_ms = started.elapsed().as_millis() as u64,
            "MCP tool call"
        );

        match outcome {
            Ok(value) => McpResponse::result(
                id,
                json!({
                    "content": [{ "type": "text", "text": value.to_string() }],
                    "isError": false
                }),
            ),
            Err(e) => McpResponse::error_with_data(
                id,
                e.code(),
                e.to_string(),
                json!({ "tool": call.name() }),
            ),
        }
    }
}

fn handle_resource_read(id: Value, params: &Value) -> McpResponse {
    let uri = params["uri"].as_str().unwrap_or("");
    match uri.strip_prefix(GREETING_URI_PREFIX) {
        Some(name) if !name.is_empty() => {
            let contents = ResourceContents {
                uri: uri.to_string(),
                mime_type: "text/plain".to_string(),
                text: greeting(name),
            };
            McpResponse::result(id, json!({ "contents": [contents] }))
        }
        _ => McpResponse::error(id, ERROR_INVALID_PARAMS, format!("Unknown resource: {uri}")),
    }
}

/// Get a personalized greeting
pub fn greeting(name: &str) -> String {
    format!("Hello, {name}!")
}

#[derive(Debug, Deserialize)]
pub struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Result from any serializable payload; a payload that cannot be
    /// serialized becomes an internal error
    fn serialized<T: Serialize>(id: Value, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(result) => Self::result(id, result),
            Err(e) => Self::error(
                id,
                ERROR_INTERNAL_ERROR,
                format!("Failed to serialize result: {e}"),
            ),
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    fn error_with_data(id: Value, code: i32, message: impl Into<String>, data: Value) -> Self {
        let mut response = Self::error(id, code, message);
        if let Some(error) = response.error.as_mut() {
            error.data = Some(data);
        }
        response
    }
}
