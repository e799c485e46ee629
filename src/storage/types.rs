//! Stored entries and their metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialization hints for a write
///
/// The adapter does not interpret these; they are recorded in the entry
/// metadata so a different backend could honor them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Request compression
    #[serde(default)]
    pub compress: bool,
    /// Request encryption at rest
    #[serde(default)]
    pub encrypt: bool,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StorageOptions {
    /// Options carrying a single tag
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tags: vec![tag.into()],
            ..Default::default()
        }
    }
}

/// Metadata stored alongside each value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// First write of this key
    pub created_at: DateTime<Utc>,
    /// Most recent write of this key
    pub updated_at: DateTime<Utc>,
    /// Options supplied with the most recent write
    #[serde(default)]
    pub options: StorageOptions,
}

/// A stored value with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// JSON value
    pub value: serde_json::Value,
    /// Entry metadata
    pub metadata: EntryMetadata,
}
