/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`: interactive chat on a connection
- `connections`: add, remove and refresh tool-server connections
- `tools`: list and toggle tools
- `conversations`: list, show and delete conversations
- `executions`: inspect the tool execution log
- `share`: export and import share links

Every handler works on an [`AppContext`] built once from the configuration.
*/

use std::sync::Arc;

use crate::agent::TurnOrchestrator;
use crate::chat::ChatSession;
use crate::config::Config;
use crate::connections::ConnectionManager;
use crate::error::{McpConnectError, Result};
use crate::mcp::{HttpMcpClient, ToolRouter};
use crate::model::{Connection, Conversation};
use crate::providers::create_provider;
use crate::storage::open_storage;

pub mod chat;
pub mod connections;
pub mod conversations;
pub mod executions;
pub mod share;
pub mod special_commands;
pub mod tools;

/// Everything the command handlers share
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// Connection state manager
    pub manager: ConnectionManager,
    /// MCP client used for discovery and tool calls
    pub mcp: Arc<HttpMcpClient>,
    /// Chat session over the manager
    pub session: ChatSession,
}

impl AppContext {
    /// Wire storage, provider and MCP client from the configuration
    pub fn new(config: Config) -> Result<Self> {
        let storage = open_storage(&config.storage)?;
        let manager =
            ConnectionManager::new(storage).with_default_title(config.chat.default_title.clone());
        let mcp = Arc::new(HttpMcpClient::new()?);
        let provider = create_provider(&config.provider)?;
        let orchestrator =
            TurnOrchestrator::new(provider, Arc::new(ToolRouter::new(mcp.clone())));
        let session = ChatSession::new(manager.clone(), orchestrator, config.credentials());

        Ok(Self {
            config,
            manager,
            mcp,
            session,
        })
    }

    /// Resolve a connection by id or name
    pub async fn connection(&self, id_or_name: &str) -> Result<Connection> {
        self.manager.find(id_or_name).await
    }

    /// Resolve a conversation by id or unique id prefix
    pub async fn conversation(&self, connection: &Connection, id: &str) -> Result<Conversation> {
        let conversations = self.manager.conversations().list(&connection.id).await?;
        let matches: Vec<&Conversation> = conversations
            .iter()
            .filter(|c| c.id.starts_with(id))
            .collect();
        match matches.as_slice() {
            [only] => Ok((*only).clone()),
            [] => Err(McpConnectError::NotFound(format!("conversation '{}'", id)).into()),
            _ => Err(McpConnectError::Config(format!(
                "conversation id prefix '{}' is ambiguous ({} matches)",
                id,
                matches.len()
            ))
            .into()),
        }
    }
}

/// First eight characters of an id
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate to `max` characters with an ellipsis
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
