//! Connection state manager
//!
//! Owns everything keyed by connection id: the connection list, remote tool
//! catalogs, disabled-tool sets, and (through the history stores)
//! conversations and executions. Clones share storage, locks and the
//! enablement notifier, so one manager per process keeps every view
//! consistent.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{McpConnectError, Result};
use crate::history::{ConversationStore, ExecutionLog};
use crate::mcp::ToolDiscovery;
use crate::model::{Connection, Tool};
use crate::storage::{keys, load_json, save_json, StorageAdapter, StorageOptions};
use crate::tools::{system_tools, Subscription, ToolEnablement, ToolStateChange, ToolStateNotifier};

/// Manages connections and their per-connection state
#[derive(Clone)]
pub struct ConnectionManager {
    storage: Arc<dyn StorageAdapter>,
    conversations: ConversationStore,
    executions: ExecutionLog,
    notifier: ToolStateNotifier,
    write_lock: Arc<Mutex<()>>,
}

impl ConnectionManager {
    /// Create a manager over a storage adapter
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        let executions = ExecutionLog::new(storage.clone());
        let conversations = ConversationStore::new(storage.clone(), executions.clone());
        Self {
            storage,
            conversations,
            executions,
            notifier: ToolStateNotifier::new(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Use a custom title for conversations created without one
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.conversations = self.conversations.with_default_title(title);
        self
    }

    /// Conversation store sharing this manager's storage
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Execution log sharing this manager's storage
    pub fn executions(&self) -> &ExecutionLog {
        &self.executions
    }

    /// Enablement change notifier
    pub fn notifier(&self) -> &ToolStateNotifier {
        &self.notifier
    }

    /// Register a listener for enablement changes on any connection
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ToolStateChange) -> Result<()> + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    // ----- connections -----

    /// All connections
    pub async fn list(&self) -> Result<Vec<Connection>> {
        Ok(load_json(self.storage.as_ref(), keys::CONNECTIONS)
            .await?
            .unwrap_or_default())
    }

    /// One connection by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no connection has this id
    pub async fn get(&self, id: &str) -> Result<Connection> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| McpConnectError::NotFound(format!("connection '{}'", id)).into())
    }

    /// Look a connection up by id, falling back to an exact name match
    pub async fn find(&self, id_or_name: &str) -> Result<Connection> {
        let connections = self.list().await?;
        connections
            .iter()
            .find(|c| c.id == id_or_name)
            .or_else(|| connections.iter().find(|c| c.name == id_or_name))
            .cloned()
            .ok_or_else(|| McpConnectError::NotFound(format!("connection '{}'", id_or_name)).into())
    }

    /// Add a connection
    ///
    /// # Errors
    ///
    /// Returns `Config` for an empty name or a non-HTTP(S) URL
    pub async fn add(&self, connection: Connection) -> Result<Connection> {
        validate_connection(&connection)?;

        let _guard = self.write_lock.lock().await;
        let mut connections = self.list().await?;
        if connections.iter().any(|c| c.id == connection.id) {
            return Err(McpConnectError::Config(format!(
                "connection '{}' already exists",
                connection.id
            ))
            .into());
        }
        connections.push(connection.clone());
        self.write_connections(&connections).await?;

        tracing::info!("Added connection {} ({})", connection.name, connection.url);
        Ok(connection)
    }

    /// Replace a stored connection
    pub async fn update(&self, connection: Connection) -> Result<()> {
        validate_connection(&connection)?;

        let _guard = self.write_lock.lock().await;
        let mut connections = self.list().await?;
        let slot = connections
            .iter_mut()
            .find(|c| c.id == connection.id)
            .ok_or_else(|| McpConnectError::NotFound(format!("connection '{}'", connection.id)))?;
        *slot = connection;
        self.write_connections(&connections).await
    }

    /// Remove a connection and everything it owns
    ///
    /// Conversations go first (taking their executions with them), then any
    /// remaining execution records, tool catalog and disabled set.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let connection = self.get(id).await?;

        self.conversations.clear_all(id).await?;
        self.executions.clear(id).await?;
        self.storage.delete(&keys::tools(id)).await?;
        self.storage.delete(&keys::disabled_tools(id)).await?;

        let _guard = self.write_lock.lock().await;
        let mut connections = self.list().await?;
        connections.retain(|c| c.id != id);
        self.write_connections(&connections).await?;

        tracing::info!("Removed connection {}", connection.name);
        Ok(())
    }

    /// Record whether the last contact with the server succeeded
    pub async fn set_connected(&self, id: &str, connected: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut connections = self.list().await?;
        if let Some(connection) = connections.iter_mut().find(|c| c.id == id) {
            if connection.is_connected != connected {
                connection.is_connected = connected;
                self.write_connections(&connections).await?;
            }
        }
        Ok(())
    }

    async fn write_connections(&self, connections: &[Connection]) -> Result<()> {
        save_json(
            self.storage.as_ref(),
            keys::CONNECTIONS,
            connections,
            StorageOptions::tagged("connections"),
        )
        .await
    }

    // ----- tool catalog -----

    /// Remote tool catalog of a connection
    pub async fn tools(&self, id: &str) -> Result<Vec<Tool>> {
        Ok(load_json(self.storage.as_ref(), &keys::tools(id))
            .await?
            .unwrap_or_default())
    }

    /// Replace the remote tool catalog of a connection
    ///
    /// System tools are process-global and never stored per connection.
    pub async fn set_tools(&self, id: &str, tools: &[Tool]) -> Result<()> {
        let remote: Vec<&Tool> = tools.iter().filter(|t| !t.is_system()).collect();
        save_json(
            self.storage.as_ref(),
            &keys::tools(id),
            &remote,
            StorageOptions::tagged("tools"),
        )
        .await
    }

    /// Re-fetch the remote catalog from the tool server
    ///
    /// Updates the connection's `is_connected` flag either way.
    pub async fn refresh_tools(&self, id: &str, discovery: &dyn ToolDiscovery) -> Result<Vec<Tool>> {
        let connection = self.get(id).await?;
        match discovery.list_tools(&connection).await {
            Ok(tools) => {
                self.set_tools(id, &tools).await?;
                self.set_connected(id, true).await?;
                tracing::info!(
                    "Refreshed {} tools for connection {}",
                    tools.len(),
                    connection.name
                );
                Ok(tools)
            }
            Err(e) => {
                self.set_connected(id, false).await?;
                tracing::warn!("Tool refresh failed for {}: {}", connection.name, e);
                Err(e)
            }
        }
    }

    // ----- enablement -----

    /// Disabled tool ids of a connection
    pub async fn disabled_tools(&self, id: &str) -> Result<HashSet<String>> {
        let ids: Vec<String> = load_json(self.storage.as_ref(), &keys::disabled_tools(id))
            .await?
            .unwrap_or_default();
        Ok(ids.into_iter().collect())
    }

    /// Replace the disabled set and notify listeners
    ///
    /// Takes effect on the next turn; past executions are untouched.
    pub async fn update_disabled_tools(&self, id: &str, disabled: HashSet<String>) -> Result<()> {
        let mut sorted: Vec<String> = disabled.into_iter().collect();
        sorted.sort();

        {
            let _guard = self.write_lock.lock().await;
            save_json(
                self.storage.as_ref(),
                &keys::disabled_tools(id),
                &sorted,
                StorageOptions::tagged("disabled_tools"),
            )
            .await?;
        }

        let delivered = self.notifier.publish(&ToolStateChange {
            connection_id: id.to_string(),
            disabled: sorted,
        });
        tracing::debug!("Tool state change on {} delivered to {} listeners", id, delivered);
        Ok(())
    }

    /// Enable or disable one tool
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tool is not in the connection's catalog
    pub async fn set_tool_enabled(&self, id: &str, tool_id: &str, enabled: bool) -> Result<()> {
        let enablement = self.enablement(id).await?;
        if !enablement.tools().iter().any(|t| t.id == tool_id) {
            return Err(McpConnectError::NotFound(format!("tool '{}'", tool_id)).into());
        }

        let mut disabled = enablement.disabled().clone();
        let changed = if enabled {
            disabled.remove(tool_id)
        } else {
            disabled.insert(tool_id.to_string())
        };
        if changed {
            self.update_disabled_tools(id, disabled).await?;
        }
        Ok(())
    }

    /// Catalog (remote and system tools) with the disabled set
    pub async fn enablement(&self, id: &str) -> Result<ToolEnablement> {
        let mut catalog = self.tools(id).await?;
        catalog.extend(system_tools());
        let mut seen = HashSet::new();
        catalog.retain(|t| seen.insert(t.id.clone()));
        Ok(ToolEnablement::new(catalog, self.disabled_tools(id).await?))
    }

    /// Whether a tool is offered on the next turn
    pub async fn is_enabled(&self, id: &str, tool_id: &str) -> Result<bool> {
        Ok(!self.disabled_tools(id).await?.contains(tool_id))
    }

    /// Tools offered on the next turn
    pub async fn enabled_tools(&self, id: &str) -> Result<Vec<Tool>> {
        Ok(self.enablement(id).await?.enabled_tools())
    }
}

fn validate_connection(connection: &Connection) -> Result<()> {
    if connection.name.trim().is_empty() {
        return Err(McpConnectError::Config("connection name cannot be empty".to_string()).into());
    }
    let url = url::Url::parse(&connection.url).map_err(|e| {
        McpConnectError::Config(format!("invalid connection URL '{}': {}", connection.url, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(McpConnectError::Config(format!(
            "connection URL must use http or https, got '{}'",
            url.scheme()
        ))
        .into());
    }
    Ok(())
}
