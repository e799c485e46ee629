//! Streamable HTTP client for MCP tool servers
//!
//! Every JSON-RPC request is an HTTP POST to the connection URL. The server
//! replies with either an `application/json` body or a `text/event-stream`
//! body carrying one or more JSON-RPC messages; the message whose id matches
//! the request is the answer.
//!
//! # Session management
//!
//! The first request on a connection performs the `initialize` handshake
//! and captures the `MCP-Session-Id` response header, which is attached to
//! every later POST. A `404` while a session is active means the server
//! dropped it: the session is cleared, the handshake is repeated once and
//! the request is re-sent.
//!
//! # Retries
//!
//! Transport failures and `5xx` statuses are retried up to the connection's
//! `retry_count` with a linear backoff. JSON-RPC errors and `4xx` statuses
//! are not retried.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::error::{McpConnectError, Result};
use crate::mcp::executor::{ToolDiscovery, ToolExecutor};
use crate::mcp::types::{
    CallToolParams, CallToolResponse, InitializeParams, InitializeResponse, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsResponse, LATEST_PROTOCOL_VERSION,
    METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use crate::model::{Connection, Tool, ToolOutput};

const SESSION_HEADER: &str = "MCP-Session-Id";
const PROTOCOL_HEADER: &str = "MCP-Protocol-Version";
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);
const MAX_TOOL_PAGES: usize = 50;

/// Why a single POST failed
#[derive(Debug)]
enum PostFailure {
    /// Network error or unreadable body; retryable
    Transport(String),
    /// Non-success HTTP status; retryable when 5xx
    Status(u16, String),
    /// `404` while a session was attached
    SessionExpired,
}

impl PostFailure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(status, _) => *status >= 500,
            Self::SessionExpired => false,
        }
    }

    fn into_error(self) -> anyhow::Error {
        match self {
            Self::Transport(msg) => McpConnectError::McpTransport(msg).into(),
            Self::Status(status, body) => McpConnectError::McpTransport(format!(
                "HTTP POST returned status {}: {}",
                status, body
            ))
            .into(),
            Self::SessionExpired => {
                McpConnectError::McpTransport("mcp session expired".to_string()).into()
            }
        }
    }
}

/// A successful POST
#[derive(Debug)]
struct RawResponse {
    session_id: Option<String>,
    is_event_stream: bool,
    body: String,
}

/// Negotiated state for one connection
#[derive(Debug, Clone, Default)]
struct Session {
    id: Option<String>,
}

/// MCP client speaking JSON-RPC over Streamable HTTP
///
/// One client serves any number of connections; sessions are tracked per
/// connection id. Clones share sessions.
///
/// # Examples
///
/// ```
/// use mcpconnect::mcp::HttpMcpClient;
///
/// let client = HttpMcpClient::new();
/// assert!(client.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct HttpMcpClient {
    http: reqwest::Client,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    handshakes: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    next_id: Arc<AtomicU64>,
    retry_backoff: Duration,
}

impl HttpMcpClient {
    /// Create a new client
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("mcpconnect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                McpConnectError::McpTransport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            handshakes: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        })
    }

    /// Override the base delay between retries
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Session id currently attached to requests for a connection
    pub async fn session_id(&self, connection_id: &str) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(connection_id)
            .and_then(|s| s.id.clone())
    }

    /// Forget the negotiated session; the next request re-initializes
    pub async fn reset_session(&self, connection_id: &str) {
        self.sessions.write().await.remove(connection_id);
    }

    /// Send a JSON-RPC request and return its `result`
    ///
    /// # Errors
    ///
    /// Returns `Mcp` for JSON-RPC errors and `McpTransport` for HTTP
    /// failures that survive retries.
    pub async fn request(
        &self,
        connection: &Connection,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        let session = self.ensure_session(connection).await?;
        match self
            .call(connection, session.as_deref(), method, params.clone())
            .await
        {
            Err(PostFailure::SessionExpired) => {
                tracing::warn!(
                    "MCP session expired for connection {}, re-initializing",
                    connection.name
                );
                self.reset_session(&connection.id).await;
                let session = self.ensure_session(connection).await?;
                self.call(connection, session.as_deref(), method, params)
                    .await
                    .map_err(PostFailure::into_error)?
            }
            other => other.map_err(PostFailure::into_error)?,
        }
    }

    /// Session for a connection, running the handshake if there is none
    ///
    /// Handshakes are serialized per connection so concurrent first requests
    /// share one session.
    async fn ensure_session(&self, connection: &Connection) -> Result<Option<String>> {
        if let Some(session) = self.cached_session(&connection.id).await {
            return Ok(session);
        }

        let gate = self
            .handshakes
            .lock()
            .await
            .entry(connection.id.clone())
            .or_default()
            .clone();
        let _handshake = gate.lock().await;
        if let Some(session) = self.cached_session(&connection.id).await {
            return Ok(session);
        }

        tracing::debug!("Initializing MCP session for {}", connection.url);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(
            id,
            METHOD_INITIALIZE,
            Some(serde_json::to_value(InitializeParams::default())?),
        );
        let raw = self
            .post_with_retry(connection, None, &serde_json::to_value(&request)?)
            .await
            .map_err(PostFailure::into_error)?;

        let result = decode_result(&raw, id)?;
        let init: InitializeResponse = serde_json::from_value(result).map_err(|e| {
            McpConnectError::McpTransport(format!("Invalid initialize response: {}", e))
        })?;
        tracing::info!(
            "MCP session established with {} (protocol {})",
            init.server_info
                .as_ref()
                .map(|s| s.name.as_str())
                .unwrap_or("unknown server"),
            init.protocol_version
        );

        let session_id = raw.session_id;
        let notification = serde_json::to_value(JsonRpcNotification::new(METHOD_INITIALIZED))?;
        if let Err(e) = self
            .post_with_retry(connection, session_id.as_deref(), &notification)
            .await
        {
            tracing::warn!("Server rejected initialized notification: {:?}", e);
        }

        self.sessions.write().await.insert(
            connection.id.clone(),
            Session {
                id: session_id.clone(),
            },
        );
        Ok(session_id)
    }

    async fn cached_session(&self, connection_id: &str) -> Option<Option<String>> {
        self.sessions
            .read()
            .await
            .get(connection_id)
            .map(|s| s.id.clone())
    }

    async fn call(
        &self,
        connection: &Connection,
        session: Option<&str>,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Result<Value>, PostFailure> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => return Ok(Err(e.into())),
        };
        let raw = self.post_with_retry(connection, session, &body).await?;
        Ok(decode_result(&raw, id))
    }

    async fn post_with_retry(
        &self,
        connection: &Connection,
        session: Option<&str>,
        body: &Value,
    ) -> std::result::Result<RawResponse, PostFailure> {
        let mut attempt: u32 = 0;
        loop {
            match self.post_once(connection, session, body).await {
                Ok(raw) => return Ok(raw),
                Err(failure) if failure.is_retryable() && attempt < connection.retry_count => {
                    attempt += 1;
                    tracing::warn!(
                        "MCP request to {} failed ({:?}), retry {}/{}",
                        connection.url,
                        failure,
                        attempt,
                        connection.retry_count
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    async fn post_once(
        &self,
        connection: &Connection,
        session: Option<&str>,
        body: &Value,
    ) -> std::result::Result<RawResponse, PostFailure> {
        let mut req = self
            .http
            .post(&connection.url)
            .timeout(Duration::from_millis(connection.timeout_ms))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header(PROTOCOL_HEADER, LATEST_PROTOCOL_VERSION)
            .json(body);

        if let Some(id) = session {
            req = req.header(SESSION_HEADER, id);
        }
        for (k, v) in connection.auth.request_headers() {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req
            .send()
            .await
            .map_err(|e| PostFailure::Transport(format!("HTTP POST failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND && session.is_some() {
            return Err(PostFailure::SessionExpired);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PostFailure::Status(status.as_u16(), text));
        }

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/event-stream"))
            .unwrap_or(false);
        let body = response
            .text()
            .await
            .map_err(|e| PostFailure::Transport(format!("failed to read response body: {}", e)))?;

        Ok(RawResponse {
            session_id,
            is_event_stream,
            body,
        })
    }
}

/// Extract the `result` answering request `id` from a raw response
fn decode_result(raw: &RawResponse, id: u64) -> Result<Value> {
    let response = if raw.is_event_stream {
        sse_data_events(&raw.body)
            .into_iter()
            .filter_map(|data| serde_json::from_str::<JsonRpcResponse>(&data).ok())
            .find(|r| r.answers(id))
    } else if raw.body.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str::<JsonRpcResponse>(&raw.body).map_err(|e| {
            McpConnectError::McpTransport(format!("Invalid JSON-RPC response: {}", e))
        })?)
    };

    let response = response.ok_or_else(|| {
        McpConnectError::McpTransport(format!("No response received for request {}", id))
    })?;

    if let Some(error) = response.error {
        return Err(McpConnectError::Mcp {
            code: error.code,
            message: error.message,
        }
        .into());
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// Collect the `data:` payloads of each event in an SSE body
///
/// Multi-line data fields are joined with `\n`. Comments and the `event`,
/// `id` and `retry` fields are ignored.
fn sse_data_events(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut data: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                events.push(data.join("\n"));
                data.clear();
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if !data.is_empty() {
        events.push(data.join("\n"));
    }
    events
}

#[async_trait]
impl ToolExecutor for HttpMcpClient {
    async fn execute(
        &self,
        connection: &Connection,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolOutput> {
        let params = serde_json::to_value(CallToolParams {
            name: tool_name.to_string(),
            arguments,
        })?;
        let result = self
            .request(connection, METHOD_TOOLS_CALL, Some(params))
            .await?;

        if let Ok(parsed) = serde_json::from_value::<CallToolResponse>(result.clone()) {
            if parsed.is_error == Some(true) {
                let text = parsed.text();
                let message = if text.is_empty() {
                    format!("Tool '{}' reported an error", tool_name)
                } else {
                    text
                };
                return Err(McpConnectError::ToolExecution(message).into());
            }
        }

        Ok(ToolOutput::new(result))
    }
}

#[async_trait]
impl ToolDiscovery for HttpMcpClient {
    async fn list_tools(&self, connection: &Connection) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.request(connection, METHOD_TOOLS_LIST, params).await?;
            let page: ListToolsResponse = serde_json::from_value(result).map_err(|e| {
                McpConnectError::McpTransport(format!("Invalid tools/list response: {}", e))
            })?;
            tools.extend(page.tools.into_iter().map(Tool::from));

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!("Discovered {} tools on {}", tools.len(), connection.url);
        Ok(tools)
    }
}
