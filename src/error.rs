//! Error types for MCPConnect
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for MCPConnect operations
///
/// Errors that make a turn meaningless (missing credentials, a failed first
/// provider call) propagate to the caller. Errors local to a single tool call
/// are converted into data (a failed `ToolExecution`) and never cross the
/// orchestrator boundary.
#[derive(Error, Debug)]
pub enum McpConnectError {
    /// Missing or invalid configuration, including a missing API key
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider answered with a non-success HTTP status
    #[error("Provider error ({status}): {body}")]
    Provider {
        /// HTTP status code returned by the provider
        status: u16,
        /// Raw error body as returned by the provider
        body: String,
    },

    /// The provider could not be reached or returned an unreadable body
    #[error("Provider request failed: {0}")]
    ProviderTransport(String),

    /// A single tool invocation failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// The follow-up provider call (after tool results) failed
    #[error("Follow-up request failed: {0}")]
    FollowUp(String),

    /// Malformed or oversized share payload
    #[error("Share format error: {0}")]
    ShareFormat(String),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A referenced connection, conversation or tool does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON-RPC error returned by an MCP tool server
    #[error("MCP error {code}: {message}")]
    Mcp {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the server
        message: String,
    },

    /// Transport-level failure talking to an MCP tool server
    #[error("MCP transport error: {0}")]
    McpTransport(String),

    /// The turn was cancelled by the caller
    #[error("Turn cancelled")]
    Cancelled,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite errors from the persistent storage backend
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl McpConnectError {
    /// Returns true when this error represents a caller-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for MCPConnect operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Domain errors
/// are recovered with `err.downcast_ref::<McpConnectError>()`.
pub type Result<T> = anyhow::Result<T>;

/// Returns true when an `anyhow` error wraps [`McpConnectError::Cancelled`]
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<McpConnectError>()
        .map(McpConnectError::is_cancelled)
        .unwrap_or(false)
}
