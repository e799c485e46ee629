//! Chat messages
//!
//! A message is exactly one of: a plain text message, a tool-execution
//! message, or a transient pending placeholder. The roles are modelled as a
//! sum type so invalid combinations (a pending message carrying a tool
//! error, for example) cannot be constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ToolOutput;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    /// The human user
    User,
    /// The model (including tool-execution entries it triggered)
    Assistant,
}

/// Status of a tool execution, shared by messages and audit records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Invocation in flight
    Pending,
    /// Invocation returned a result
    Success,
    /// Invocation failed
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Execution state attached to a tool-execution message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionState {
    /// Still running
    Pending,
    /// Completed with a result
    Success {
        /// Opaque tool result
        result: ToolOutput,
    },
    /// Completed with an error
    Error {
        /// Error message
        error: String,
    },
}

impl ExecutionState {
    /// Returns the flat status of this state
    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Pending => ExecutionStatus::Pending,
            Self::Success { .. } => ExecutionStatus::Success,
            Self::Error { .. } => ExecutionStatus::Error,
        }
    }
}

/// The role-specific content of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    /// "Thinking" placeholder shown while the assistant has produced nothing
    /// visible yet. Never persisted.
    Pending,
    /// Plain text
    Text {
        /// Message content
        text: String,
    },
    /// One tool invocation
    ToolExecution {
        /// Id of the audit record in the execution log
        execution_id: String,
        /// Name of the invoked tool
        tool_name: String,
        /// Current state of the invocation
        state: ExecutionState,
    },
}

/// One turn unit in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: String,
    /// Author of the message
    pub author: Author,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Role-specific content
    pub body: MessageBody,
}

impl Message {
    fn with_body(author: Author, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author,
            created_at: Utc::now(),
            body,
        }
    }

    /// Creates a user text message
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpconnect::model::{Author, Message};
    ///
    /// let msg = Message::user("What's 2+2?");
    /// assert_eq!(msg.author, Author::User);
    /// assert_eq!(msg.text(), Some("What's 2+2?"));
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_body(Author::User, MessageBody::Text { text: text.into() })
    }

    /// Creates an assistant text message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_body(Author::Assistant, MessageBody::Text { text: text.into() })
    }

    /// Creates a pending "thinking" placeholder
    pub fn pending() -> Self {
        Self::with_body(Author::Assistant, MessageBody::Pending)
    }

    /// Creates a tool-execution message
    pub fn tool_execution(
        execution_id: impl Into<String>,
        tool_name: impl Into<String>,
        state: ExecutionState,
    ) -> Self {
        Self::with_body(
            Author::Assistant,
            MessageBody::ToolExecution {
                execution_id: execution_id.into(),
                tool_name: tool_name.into(),
                state,
            },
        )
    }

    /// Returns the text content, if this is a text message
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns true for plain text messages
    pub fn is_text(&self) -> bool {
        matches!(self.body, MessageBody::Text { .. })
    }

    /// Returns true for transient placeholders
    pub fn is_pending(&self) -> bool {
        matches!(self.body, MessageBody::Pending)
    }

    /// Returns the referenced execution id, if this is a tool-execution message
    pub fn execution_id(&self) -> Option<&str> {
        match &self.body {
            MessageBody::ToolExecution { execution_id, .. } => Some(execution_id),
            _ => None,
        }
    }
}
