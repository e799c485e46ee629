//! Per-connection conversation store
//!
//! Saving strips pending placeholders, bumps `updated_at` and derives a
//! title from the first user message. Deleting a conversation deletes the
//! executions it references first.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{ExecutionLog, DEFAULT_CONVERSATION_TITLE};
use crate::error::{McpConnectError, Result};
use crate::model::Conversation;
use crate::storage::{keys, load_json, save_json, StorageAdapter, StorageOptions};

/// Per-connection conversation list
///
/// Deleting conversations always removes the executions they reference
/// first, so a failure part-way leaves conversations pointing at missing
/// executions (rendered as unknown) rather than orphaned executions.
#[derive(Clone)]
pub struct ConversationStore {
    storage: Arc<dyn StorageAdapter>,
    executions: ExecutionLog,
    write_lock: Arc<Mutex<()>>,
    default_title: String,
}

impl ConversationStore {
    /// Create a store; `executions` must be the log used by the rest of
    /// the application
    pub fn new(storage: Arc<dyn StorageAdapter>, executions: ExecutionLog) -> Self {
        Self {
            storage,
            executions,
            write_lock: Arc::new(Mutex::new(())),
            default_title: DEFAULT_CONVERSATION_TITLE.to_string(),
        }
    }

    /// Title given to conversations created without one
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    /// All conversations of a connection in creation order
    pub async fn list(&self, connection_id: &str) -> Result<Vec<Conversation>> {
        Ok(
            load_json(self.storage.as_ref(), &keys::conversations(connection_id))
                .await?
                .unwrap_or_default(),
        )
    }

    /// One conversation by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the conversation does not exist
    pub async fn get(&self, connection_id: &str, id: &str) -> Result<Conversation> {
        self.list(connection_id)
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| McpConnectError::NotFound(format!("conversation '{}'", id)).into())
    }

    /// Create and persist an empty conversation
    pub async fn create(&self, connection_id: &str, title: Option<&str>) -> Result<Conversation> {
        let _guard = self.write_lock.lock().await;
        self.insert_new(connection_id, title).await
    }

    /// Append a new conversation; the caller holds the write lock
    async fn insert_new(&self, connection_id: &str, title: Option<&str>) -> Result<Conversation> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.default_title);
        let conversation = Conversation::new(connection_id, title);

        let mut conversations = self.list(connection_id).await?;
        conversations.push(conversation.clone());
        self.write(connection_id, &conversations).await?;

        tracing::info!(
            "Created conversation {} on connection {}",
            conversation.id,
            connection_id
        );
        Ok(conversation)
    }

    /// Conversation to show on a first visit
    ///
    /// Returns the most recently updated conversation, creating one when the
    /// connection has none.
    pub async fn ensure_default(&self, connection_id: &str) -> Result<Conversation> {
        let _guard = self.write_lock.lock().await;
        let existing = self
            .list(connection_id)
            .await?
            .into_iter()
            .max_by_key(|c| c.updated_at);
        match existing {
            Some(conversation) => Ok(conversation),
            None => self.insert_new(connection_id, None).await,
        }
    }

    /// Persist a conversation, replacing the stored copy
    ///
    /// Pending placeholders are stripped, `updated_at` is bumped and a
    /// default title is replaced by one derived from the first user message.
    /// Returns the stored copy.
    pub async fn save(&self, conversation: &Conversation) -> Result<Conversation> {
        let mut stored = conversation.persistable();
        stored.updated_at = Utc::now();
        if stored.title == self.default_title {
            if let Some(title) = stored.suggested_title() {
                stored.title = title;
            }
        }

        let _guard = self.write_lock.lock().await;
        let mut conversations = self.list(&stored.connection_id).await?;
        match conversations.iter_mut().find(|c| c.id == stored.id) {
            Some(existing) => *existing = stored.clone(),
            None => conversations.push(stored.clone()),
        }
        self.write(&stored.connection_id, &conversations).await?;
        Ok(stored)
    }

    /// Delete a conversation and every execution it references
    ///
    /// Returns the number of executions removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the conversation does not exist
    pub async fn delete(&self, connection_id: &str, id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut conversations = self.list(connection_id).await?;
        let index = conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| McpConnectError::NotFound(format!("conversation '{}'", id)))?;

        let removed = self
            .executions
            .delete_many(connection_id, &conversations[index].execution_ids())
            .await?;
        conversations.remove(index);
        self.write(connection_id, &conversations).await?;

        tracing::info!(
            "Deleted conversation {} and {} executions",
            id,
            removed
        );
        Ok(removed)
    }

    /// Delete every conversation of a connection and the executions they
    /// reference; returns the number of executions removed
    pub async fn clear_all(&self, connection_id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let conversations = self.list(connection_id).await?;
        let ids: Vec<String> = conversations
            .iter()
            .flat_map(|c| c.execution_ids())
            .collect();

        let removed = self.executions.delete_many(connection_id, &ids).await?;
        self.storage
            .delete(&keys::conversations(connection_id))
            .await?;

        tracing::info!(
            "Cleared {} conversations and {} executions on connection {}",
            conversations.len(),
            removed,
            connection_id
        );
        Ok(removed)
    }

    async fn write(&self, connection_id: &str, conversations: &[Conversation]) -> Result<()> {
        save_json(
            self.storage.as_ref(),
            &keys::conversations(connection_id),
            conversations,
            StorageOptions::tagged("conversations"),
        )
        .await
    }
}
