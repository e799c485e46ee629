//! Per-connection tool execution log

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::ToolExecution;
use crate::storage::{keys, load_json, save_json, StorageAdapter, StorageOptions};

/// Per-connection audit log of tool executions
///
/// Stored as one JSON array under `executions:{connection}`. Clones share
/// the write lock, so read-modify-write cycles never interleave.
#[derive(Clone)]
pub struct ExecutionLog {
    storage: Arc<dyn StorageAdapter>,
    write_lock: Arc<Mutex<()>>,
}

impl ExecutionLog {
    /// Create a log over a storage adapter
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// All executions of a connection, oldest first
    pub async fn list(&self, connection_id: &str) -> Result<Vec<ToolExecution>> {
        Ok(load_json(self.storage.as_ref(), &keys::executions(connection_id))
            .await?
            .unwrap_or_default())
    }

    /// One execution by id
    pub async fn get(&self, connection_id: &str, id: &str) -> Result<Option<ToolExecution>> {
        Ok(self
            .list(connection_id)
            .await?
            .into_iter()
            .find(|e| e.id == id))
    }

    /// Insert an execution, or replace the record with the same id
    pub async fn upsert(&self, connection_id: &str, execution: &ToolExecution) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut executions = self.list(connection_id).await?;
        match executions.iter_mut().find(|e| e.id == execution.id) {
            Some(existing) => *existing = execution.clone(),
            None => executions.push(execution.clone()),
        }
        self.write(connection_id, &executions).await
    }

    /// Remove executions by id; returns how many were removed
    pub async fn delete_many(&self, connection_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut executions = self.list(connection_id).await?;
        let before = executions.len();
        executions.retain(|e| !targets.contains(e.id.as_str()));
        let removed = before - executions.len();
        if removed > 0 {
            self.write(connection_id, &executions).await?;
            tracing::debug!(
                "Removed {} executions from connection {}",
                removed,
                connection_id
            );
        }
        Ok(removed)
    }

    /// Remove the whole log of a connection
    pub async fn clear(&self, connection_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage.delete(&keys::executions(connection_id)).await
    }

    async fn write(&self, connection_id: &str, executions: &[ToolExecution]) -> Result<()> {
        save_json(
            self.storage.as_ref(),
            &keys::executions(connection_id),
            executions,
            StorageOptions::tagged("executions"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecutionStatus, ToolOutput};
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::time::Duration;

    fn log() -> ExecutionLog {
        ExecutionLog::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let log = log();
        let mut exec = ToolExecution::pending("search", json!({"q": "rust"}));
        log.upsert("c1", &exec).await.unwrap();

        exec.succeed(ToolOutput::text("done"), Duration::from_millis(12));
        log.upsert("c1", &exec).await.unwrap();

        let all = log.list("c1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ExecutionStatus::Success);
        assert_eq!(all[0].duration_ms, 12);
    }

    #[tokio::test]
    async fn test_delete_many_leaves_unrelated_records() {
        let log = log();
        let a = ToolExecution::pending("a", json!({}));
        let b = ToolExecution::pending("b", json!({}));
        let c = ToolExecution::pending("c", json!({}));
        for e in [&a, &b, &c] {
            log.upsert("c1", e).await.unwrap();
        }

        let removed = log
            .delete_many("c1", &[a.id.clone(), c.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let remaining = log.list("c1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }

    #[tokio::test]
    async fn test_logs_are_scoped_per_connection() {
        let log = log();
        let exec = ToolExecution::pending("a", json!({}));
        log.upsert("c1", &exec).await.unwrap();

        assert!(log.list("c2").await.unwrap().is_empty());
        assert!(log.get("c1", &exec.id).await.unwrap().is_some());

        log.clear("c1").await.unwrap();
        assert!(log.list("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_not_lost() {
        let log = log();
        let mut handles = Vec::new();
        for i in 0..10 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let exec = ToolExecution::pending(format!("tool-{}", i), json!({}));
                log.upsert("c1", &exec).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(log.list("c1").await.unwrap().len(), 10);
    }
}
