//! MCP protocol types and JSON-RPC 2.0 primitives
//!
//! Only the subset a chat client needs: the `initialize` handshake,
//! `tools/list` and `tools/call`. Struct fields are `camelCase` on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Tool, ToolSource};

/// Protocol revision sent in `initialize` and the `MCP-Protocol-Version` header.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-11-25";

/// Lifecycle: client sends `initialize` to open a session.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Lifecycle: client sends `notifications/initialized` after the server ACKs.
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
/// Request a page of available tools.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Invoke a named tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// A JSON-RPC 2.0 request object.
///
/// # Examples
///
/// ```
/// use mcpconnect::mcp::types::JsonRpcRequest;
///
/// let req = JsonRpcRequest::new(1, "tools/list", None);
/// assert_eq!(req.jsonrpc, "2.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Request correlation identifier.
    pub id: u64,
    /// The method name to invoke.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Builds a request with the given id
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response object.
///
/// Exactly one of `result` or `error` will be present in a valid response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Mirrors the `id` from the corresponding request.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Successful result value; mutually exclusive with `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object; mutually exclusive with `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Whether this response answers the request with `id`
    pub fn answers(&self, id: u64) -> bool {
        self.id.as_ref().and_then(|v| v.as_u64()) == Some(id)
    }
}

/// A JSON-RPC 2.0 error object.
///
/// # Examples
///
/// ```
/// use mcpconnect::mcp::types::JsonRpcError;
///
/// let e = JsonRpcError { code: -32601, message: "Method not found".to_string(), data: None };
/// assert_eq!(e.to_string(), "JSON-RPC error -32601: Method not found");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
    /// Optional additional error context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 notification (a request with no `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// The notification method name.
    pub method: String,
}

impl JsonRpcNotification {
    /// Builds a parameterless notification
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
        }
    }
}

/// Name and version of a protocol participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    /// Short name of the implementation.
    pub name: String,
    /// Version string.
    pub version: String,
}

/// Parameters sent by the client in the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// The protocol version the client wishes to use.
    pub protocol_version: String,
    /// Capabilities advertised by this client; a chat client offers none.
    pub capabilities: serde_json::Value,
    /// Information identifying this client implementation.
    pub client_info: Implementation,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({}),
            client_info: Implementation {
                name: "mcpconnect".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Response returned by the server to an `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    /// The protocol version the server selected.
    pub protocol_version: String,
    /// Information identifying the server, when sent.
    #[serde(default)]
    pub server_info: Option<Implementation>,
}

/// A tool exposed by an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Unique name of the tool within the server.
    pub name: String,
    /// Human-readable description of the tool's purpose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema describing the tool's input parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

impl From<McpTool> for Tool {
    fn from(tool: McpTool) -> Self {
        Tool {
            id: tool.name.clone(),
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            input_schema: tool.input_schema,
            parameters: Vec::new(),
            source: ToolSource::Remote,
        }
    }
}

/// Response to a `tools/list` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResponse {
    /// Tools in this page of results.
    pub tools: Vec<McpTool>,
    /// Opaque cursor for the next page; `None` means this is the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Parameters for a `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments to pass to the tool.
    pub arguments: serde_json::Value,
}

/// Response from a `tools/call` request.
///
/// Only read to detect `isError`; the raw result is kept as the opaque
/// tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResponse {
    /// The content items produced by the tool.
    #[serde(default)]
    pub content: Vec<ToolResponseContent>,
    /// When `true`, the tool signalled an error condition within its content.
    #[serde(default)]
    pub is_error: Option<bool>,
}

impl CallToolResponse {
    /// Concatenated text content, newline separated
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ToolResponseContent::Text { text } => Some(text.as_str()),
                ToolResponseContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single content item in a tool response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolResponseContent {
    /// Plain text output.
    Text {
        /// The text content.
        text: String,
    },
    /// Images, audio and embedded resources.
    #[serde(other)]
    Other,
}
