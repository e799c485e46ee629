//! Conversations
//!
//! Message order is display order. Pending placeholders never reach storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Author, Message};

/// Maximum number of characters used when deriving a title from a message
const AUTO_TITLE_MAX_CHARS: usize = 50;

/// An ordered conversation belonging to one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier
    pub id: String,
    /// Owning connection
    pub connection_id: String,
    /// Display title
    pub title: String,
    /// Messages in display order
    pub messages: Vec<Message>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// When the conversation was last saved
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an empty conversation
    pub fn new(connection_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            connection_id: connection_id.into(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Copy of this conversation with pending placeholders removed
    pub fn persistable(&self) -> Self {
        let mut copy = self.clone();
        copy.messages.retain(|m| !m.is_pending());
        copy
    }

    /// Ids of every execution referenced by this conversation's messages
    pub fn execution_ids(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter_map(|m| m.execution_id().map(str::to_string))
            .collect()
    }

    /// Text-only messages, suitable as provider history
    ///
    /// Pending placeholders and tool-execution entries are excluded.
    pub fn history_for_provider(&self) -> Vec<Message> {
        self.messages.iter().filter(|m| m.is_text()).cloned().collect()
    }

    /// Title derived from the first user message, if any
    pub fn suggested_title(&self) -> Option<String> {
        let first = self
            .messages
            .iter()
            .find(|m| m.author == Author::User && m.is_text())?
            .text()?
            .trim();
        if first.is_empty() {
            return None;
        }
        let mut title: String = first.chars().take(AUTO_TITLE_MAX_CHARS).collect();
        if first.chars().count() > AUTO_TITLE_MAX_CHARS {
            title.push_str("...");
        }
        Some(title)
    }
}
