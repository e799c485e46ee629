//! Domain model for MCPConnect
//!
//! Messages, conversations, tools, execution records and connections. All
//! types serialize with `serde` and are persisted as JSON through the
//! storage adapter.

pub mod connection;
pub mod conversation;
pub mod execution;
pub mod message;
pub mod output;
pub mod tool;

pub use connection::{AuthConfig, AuthScheme, Connection};
pub use conversation::Conversation;
pub use execution::{ExecutionRequest, ExecutionResponse, ToolExecution};
pub use message::{Author, ExecutionState, ExecutionStatus, Message, MessageBody};
pub use output::ToolOutput;
pub use tool::{Tool, ToolParameter, ToolSource};

use serde::{Deserialize, Serialize};

/// Credentials and sampling settings for one provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// Provider API key; a turn without one fails with a configuration error
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the reply
    pub max_tokens: u32,
}

impl ProviderCredentials {
    /// Returns the API key when present and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_is_treated_as_missing() {
        let creds = ProviderCredentials {
            api_key: Some("   ".to_string()),
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        };
        assert!(creds.api_key().is_none());
    }
}
