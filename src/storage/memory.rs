//! In-memory storage backend

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{EntryMetadata, StorageAdapter, StorageOptions, StoredEntry};
use crate::error::Result;

/// In-process storage backend
///
/// Clones share the same map. Used for tests and for running without a
/// database file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, StoredEntry>>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        options: StorageOptions,
    ) -> Result<()> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let created_at = entries
            .get(key)
            .map(|e| e.metadata.created_at)
            .unwrap_or(now);
        entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                metadata: EntryMetadata {
                    created_at,
                    updated_at: now,
                    options,
                },
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
