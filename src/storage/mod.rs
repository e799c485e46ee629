//! Key-value storage adapter
//!
//! Everything MCPConnect persists (connections, tool catalogs, disabled-tool
//! sets, conversations, execution logs) goes through [`StorageAdapter`] as
//! JSON values under distinct keys. There is no cross-key transactionality;
//! callers keep related writes idempotent. Writes to the same key are
//! serialized by the backend with last-write-wins semantics.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{McpConnectError, Result};

pub mod memory;
pub mod sqlite;
pub mod types;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use types::{EntryMetadata, StorageOptions, StoredEntry};

/// Storage key conventions
pub mod keys {
    /// All configured connections
    pub const CONNECTIONS: &str = "connections";

    /// Tool catalog of one connection
    pub fn tools(connection_id: &str) -> String {
        format!("tools:{}", connection_id)
    }

    /// Disabled tool ids of one connection
    pub fn disabled_tools(connection_id: &str) -> String {
        format!("disabled_tools:{}", connection_id)
    }

    /// Conversations of one connection
    pub fn conversations(connection_id: &str) -> String {
        format!("conversations:{}", connection_id)
    }

    /// Execution log of one connection
    pub fn executions(connection_id: &str) -> String {
        format!("executions:{}", connection_id)
    }
}

/// Asynchronous JSON key-value store
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Write a key, replacing any previous value
    async fn set(&self, key: &str, value: serde_json::Value, options: StorageOptions)
        -> Result<()>;

    /// Remove a key; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// All keys currently stored
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Read and deserialize a key, returning `None` when it is absent
pub async fn load_json<T: DeserializeOwned>(
    storage: &dyn StorageAdapter,
    key: &str,
) -> Result<Option<T>> {
    match storage.get(key).await? {
        Some(entry) => {
            let value = serde_json::from_value(entry.value).map_err(|e| {
                McpConnectError::Storage(format!("Failed to decode value at '{}': {}", key, e))
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Serialize and write a value under a key
pub async fn save_json<T: Serialize + ?Sized>(
    storage: &dyn StorageAdapter,
    key: &str,
    value: &T,
    options: StorageOptions,
) -> Result<()> {
    let json = serde_json::to_value(value)?;
    storage.set(key, json, options).await
}

/// Build the storage backend selected by configuration
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn StorageAdapter>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage; nothing will be persisted");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::Sqlite => {
            let storage = match &config.path {
                Some(path) => SqliteStorage::new_with_path(path)?,
                None => SqliteStorage::new()?,
            };
            Ok(Arc::new(storage))
        }
    }
}
