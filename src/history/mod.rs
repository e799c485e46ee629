//! Conversation lifecycle and execution log persistence

pub mod conversations;
pub mod executions;

pub use conversations::ConversationStore;
pub use executions::ExecutionLog;

/// Title of conversations created without one
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";
