//! Test utilities for mcpconnect
//!
//! Scripted provider, executor and discovery doubles plus a few fixtures.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{McpConnectError, Result};
use crate::mcp::{ToolDiscovery, ToolExecutor};
use crate::model::{Connection, ProviderCredentials, Tool, ToolOutput};
use crate::providers::{ContentBlock, Provider, ProviderRequest, ProviderResponse};
use crate::storage::{MemoryStorage, StorageAdapter, StorageOptions, StoredEntry};

/// Credentials with a dummy API key
pub fn credentials() -> ProviderCredentials {
    ProviderCredentials {
        api_key: Some("test-key".to_string()),
        model: "claude-test".to_string(),
        temperature: 0.7,
        max_tokens: 1024,
    }
}

/// A connection pointing at an unused local port
pub fn sample_connection() -> Connection {
    Connection::new("test-server", "http://localhost:8080/mcp")
}

/// Fresh in-memory storage
pub fn memory_storage() -> Arc<dyn StorageAdapter> {
    Arc::new(MemoryStorage::new())
}

/// In-memory storage that fails one chosen write
///
/// The `nth` write (1-based) to a key starting with `prefix` returns a
/// storage error; every other operation succeeds.
pub struct FailingWriteStorage {
    inner: MemoryStorage,
    prefix: String,
    nth: usize,
    writes: Mutex<usize>,
}

impl FailingWriteStorage {
    pub fn new(prefix: impl Into<String>, nth: usize) -> Self {
        Self {
            inner: MemoryStorage::new(),
            prefix: prefix.into(),
            nth,
            writes: Mutex::new(0),
        }
    }
}

#[async_trait]
impl StorageAdapter for FailingWriteStorage {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value, options: StorageOptions) -> Result<()> {
        if key.starts_with(&self.prefix) {
            let attempt = {
                let mut writes = self.writes.lock().unwrap();
                *writes += 1;
                *writes
            };
            if attempt == self.nth {
                return Err(McpConnectError::Storage(format!("write {} to {} failed", attempt, key)).into());
            }
        }
        self.inner.set(key, value, options).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => {
            let msg = format!("{:#}", e);
            assert!(
                msg.contains(expected),
                "Error '{}' does not contain '{}'",
                msg,
                expected
            );
        }
    }
}

enum Exhausted {
    Empty,
    Transport,
    Status(u16),
}

/// Provider that replays scripted responses and records every request
pub struct MockProvider {
    script: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
    exhausted: Exhausted,
}

impl MockProvider {
    /// Replay `responses` in order; afterwards return empty responses
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            exhausted: Exhausted::Empty,
        }
    }

    /// Fail with a transport error once the script is used up
    pub fn fail_after_responses(mut self) -> Self {
        self.exhausted = Exhausted::Transport;
        self
    }

    /// Fail with an HTTP status once the script is used up
    pub fn with_status_error(mut self, status: u16) -> Self {
        self.exhausted = Exhausted::Status(status);
        self
    }

    /// A response with a single text block
    pub fn text(text: &str) -> ProviderResponse {
        Self::blocks(vec![ContentBlock::text(text)])
    }

    /// A response with the given blocks
    pub fn blocks(content: Vec<ContentBlock>) -> ProviderResponse {
        let has_tool = content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }));
        ProviderResponse {
            content,
            stop_reason: Some(if has_tool { "tool_use" } else { "end_turn" }.to_string()),
            usage: None,
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, _api_key: &str, request: &ProviderRequest) -> Result<ProviderResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return Ok(next);
        }
        match self.exhausted {
            Exhausted::Empty => Ok(Self::blocks(Vec::new())),
            Exhausted::Transport => {
                Err(McpConnectError::ProviderTransport("connection reset".to_string()).into())
            }
            Exhausted::Status(status) => Err(McpConnectError::Provider {
                status,
                body: format!("{{\"error\":{{\"message\":\"status {}\"}}}}", status),
            }
            .into()),
        }
    }
}

/// Executor with per-tool canned results
///
/// Unknown tools succeed with a plain `"ok"` text result.
#[derive(Default)]
pub struct MockExecutor {
    results: HashMap<String, std::result::Result<serde_json::Value, String>>,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
    cancel_on_call: Option<CancellationToken>,
}

impl MockExecutor {
    /// Create an executor with no canned results
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `value` for `tool`
    pub fn with_result(mut self, tool: &str, value: serde_json::Value) -> Self {
        self.results.insert(tool.to_string(), Ok(value));
        self
    }

    /// Fail `tool` with `message`
    pub fn with_error(mut self, tool: &str, message: &str) -> Self {
        self.results
            .insert(tool.to_string(), Err(message.to_string()));
        self
    }

    /// Cancel `token` on every call and never finish
    pub fn cancel_on_call(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    /// Calls received so far as `(tool, arguments)`
    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for MockExecutor {
    async fn execute(
        &self,
        _connection: &Connection,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((tool_name.to_string(), arguments));

        if let Some(token) = &self.cancel_on_call {
            token.cancel();
            std::future::pending::<()>().await;
        }

        match self.results.get(tool_name) {
            Some(Ok(value)) => Ok(ToolOutput::new(value.clone())),
            Some(Err(message)) => Err(McpConnectError::ToolExecution(message.clone()).into()),
            None => Ok(ToolOutput::text("ok")),
        }
    }
}

/// Discovery returning a fixed catalog or a fixed failure
pub struct MockDiscovery {
    outcome: std::result::Result<Vec<Tool>, String>,
}

impl MockDiscovery {
    /// Always return `tools`
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { outcome: Ok(tools) }
    }

    /// Always fail with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl ToolDiscovery for MockDiscovery {
    async fn list_tools(&self, _connection: &Connection) -> Result<Vec<Tool>> {
        match &self.outcome {
            Ok(tools) => Ok(tools.clone()),
            Err(message) => Err(McpConnectError::McpTransport(message.clone()).into()),
        }
    }
}
