//! Base provider trait and wire types for MCPConnect
//!
//! The provider contract is a single JSON POST per call: a list of
//! role-tagged messages plus optional tool declarations in, a list of
//! content blocks out.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One content block in a provider message or response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text {
        /// Block text
        text: String,
    },
    /// The model asks for a tool invocation
    ToolUse {
        /// Provider-assigned call id
        id: String,
        /// Tool name
        name: String,
        /// Arguments object
        input: serde_json::Value,
    },
    /// Result of a tool invocation, sent back in a user message
    ToolResult {
        /// Call id this result answers
        tool_use_id: String,
        /// Result text
        content: String,
        /// Marks the result as a failure
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types this client does not interpret (thinking, images, ...)
    #[serde(other)]
    Other,
}

impl ContentBlock {
    /// Creates a text block
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a tool result block
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates a failed tool result block
    pub fn tool_error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// Message body: plain string or explicit blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Shorthand for a single text block
    Text(String),
    /// Explicit content blocks
    Blocks(Vec<ContentBlock>),
}

/// Message in a provider request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// `user` or `assistant`
    pub role: String,
    /// Message body
    pub content: MessageContent,
}

impl ProviderMessage {
    /// Creates a user text message
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpconnect::providers::ProviderMessage;
    ///
    /// let msg = ProviderMessage::user("Hello");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates an assistant text message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates a message from explicit blocks
    pub fn blocks(role: impl Into<String>, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Number of `tool_result` blocks in this message
    pub fn tool_result_count(&self) -> usize {
        match &self.content {
            MessageContent::Text(_) => 0,
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| matches!(b, ContentBlock::ToolResult { .. }))
                .count(),
        }
    }
}

/// A tool offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema of the arguments object
    pub input_schema: serde_json::Value,
}

/// One provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Model identifier
    pub model: String,
    /// Maximum tokens in the reply
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Conversation so far
    pub messages: Vec<ProviderMessage>,
    /// Tools the model may call; omitted when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens
    #[serde(default)]
    pub output_tokens: u64,
}

/// Provider reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Content blocks in the order the model produced them
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage, when reported
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ProviderResponse {
    /// Concatenation of all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether the reply contains any `tool_use` block
    pub fn has_tool_use(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

/// Language-model provider
///
/// Implementations perform exactly one HTTP call per `complete` and never
/// retry. A non-success status is reported as
/// [`McpConnectError::Provider`](crate::error::McpConnectError::Provider)
/// carrying the status and raw body.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send one request and return the model's reply
    async fn complete(&self, api_key: &str, request: &ProviderRequest)
        -> Result<ProviderResponse>;
}
