//! SQLite storage backend
//!
//! A single `kv` table keyed by storage key. Writes upsert and keep the
//! original `created_at`.

use crate::error::{McpConnectError, Result};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

use super::{EntryMetadata, StorageAdapter, StorageOptions, StoredEntry};

/// SQLite-backed storage adapter
///
/// One `kv` table holds every key. Each call opens its own connection, so
/// the adapter is `Send + Sync` without a connection pool; SQLite serializes
/// concurrent writers to the same row.
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory.
    pub fn new() -> Result<Self> {
        // Allow override of the DB path via environment variable so the
        // binary can be pointed at a scratch database.
        if let Ok(override_path) = std::env::var("MCPCONNECT_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "mcpconnect", "mcpconnect").ok_or_else(|| {
            McpConnectError::Storage("Could not determine data directory".into())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;

        let storage = Self {
            db_path: data_dir.join("mcpconnect.db"),
        };
        storage.init()?;
        Ok(storage)
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpconnect::storage::SqliteStorage;
    ///
    /// let dir = std::env::temp_dir().join("mcpconnect-doc");
    /// let storage = SqliteStorage::new_with_path(dir.join("store.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists so opening the DB file succeeds.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the backing database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value JSON NOT NULL,
                options JSON NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT value, options, created_at, updated_at FROM kv WHERE key = ?",
                params![key],
                |row| {
                    let value: String = row.get(0)?;
                    let options: String = row.get(1)?;
                    let created_at: String = row.get(2)?;
                    let updated_at: String = row.get(3)?;
                    Ok((value, options, created_at, updated_at))
                },
            )
            .optional()
            .context("Failed to query key")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;

        let Some((value, options, created_at, updated_at)) = row else {
            return Ok(None);
        };

        let value = serde_json::from_str(&value)
            .context("Failed to deserialize stored value")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;
        let options: StorageOptions = serde_json::from_str(&options).unwrap_or_default();

        Ok(Some(StoredEntry {
            value,
            metadata: EntryMetadata {
                created_at: parse_timestamp(&created_at),
                updated_at: parse_timestamp(&updated_at),
                options,
            },
        }))
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        options: StorageOptions,
    ) -> Result<()> {
        let conn = self.open()?;
        let value_json = serde_json::to_string(&value)
            .context("Failed to serialize value")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;
        let options_json = serde_json::to_string(&options)?;
        let now = Utc::now().to_rfc3339();

        // Upsert keeps the original created_at.
        conn.execute(
            "INSERT INTO kv (key, value, options, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                options = excluded.options,
                updated_at = excluded.updated_at",
            params![key, value_json, options_json, now],
        )
        .context("Failed to write key")
        .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM kv WHERE key = ?", params![key])
            .context("Failed to delete key")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv ORDER BY key")
            .context("Failed to prepare statement")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("Failed to list keys")
            .map_err(|e| McpConnectError::Storage(format!("{:#}", e)))?
            .flatten()
            .collect();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::env;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Helper: create a temporary storage instance backed by a temp directory.
    ///
    /// Returns both the `SqliteStorage` and the `TempDir` so the caller keeps
    /// ownership of the directory (preventing it from being removed).
    fn create_test_storage() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("store.db");
        let storage = SqliteStorage::new_with_path(db_path).expect("failed to create storage");
        (storage, dir)
    }

    #[test]
    fn test_init_creates_table() {
        let (storage, _dir) = create_test_storage();
        let conn = Connection::open(&storage.db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='kv'",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value_and_options() {
        let (storage, _dir) = create_test_storage();
        let options = StorageOptions {
            compress: true,
            encrypt: false,
            tags: vec!["conversations".to_string()],
        };
        storage
            .set("conversations:c1", json!([{"id": "x"}]), options.clone())
            .await
            .expect("set failed");

        let entry = storage
            .get("conversations:c1")
            .await
            .expect("get failed")
            .expect("entry missing");
        assert_eq!(entry.value, json!([{"id": "x"}]));
        assert_eq!(entry.metadata.options, options);
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let (storage, _dir) = create_test_storage();
        assert!(storage.get("nope").await.expect("get failed").is_none());
    }

    #[tokio::test]
    async fn test_set_preserves_created_at_on_update() {
        let (storage, _dir) = create_test_storage();
        storage
            .set("k", json!(1), StorageOptions::default())
            .await
            .unwrap();
        let first = storage.get("k").await.unwrap().unwrap();

        sleep(Duration::from_millis(10));
        storage
            .set("k", json!(2), StorageOptions::default())
            .await
            .unwrap();
        let second = storage.get("k").await.unwrap().unwrap();

        assert_eq!(second.value, json!(2));
        assert_eq!(second.metadata.created_at, first.metadata.created_at);
        assert!(second.metadata.updated_at > first.metadata.updated_at);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (storage, _dir) = create_test_storage();
        storage
            .set("k", json!("v"), StorageOptions::default())
            .await
            .unwrap();
        storage.delete("k").await.expect("first delete failed");
        storage.delete("k").await.expect("second delete failed");
        assert!(storage.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_are_sorted() {
        let (storage, _dir) = create_test_storage();
        for key in ["tools:b", "connections", "tools:a"] {
            storage
                .set(key, json!(null), StorageOptions::default())
                .await
                .unwrap();
        }
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["connections", "tools:a", "tools:b"]
        );
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        // Use nested path to ensure parent directory creation is exercised.
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("store.db");
        env::set_var("MCPCONNECT_DB", db_path.to_string_lossy().to_string());

        let storage = SqliteStorage::new().expect("new failed with env override");
        assert_eq!(storage.db_path, db_path);
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("MCPCONNECT_DB");
    }
}
