//! Chat session
//!
//! Drives a streamed turn and keeps stored history consistent with it.

use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::{TurnEvent, TurnInput, TurnOrchestrator};
use crate::connections::ConnectionManager;
use crate::error::Result;
use crate::model::{Conversation, ExecutionState, Message, ProviderCredentials};

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// Tool messages and the assistant reply were saved
    Completed,
    /// The turn failed; an assistant error message was saved
    Failed(String),
    /// The turn was cancelled; only the user message was saved
    Cancelled,
}

/// Result of [`ChatSession::send_message`]
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Conversation as persisted after the turn
    pub conversation: Conversation,
    /// How the turn ended
    pub status: TurnStatus,
}

/// Sends user messages and keeps persisted history consistent
///
/// The pending placeholder lives only in the view handed to `on_event`;
/// storage only ever sees complete turns.
#[derive(Clone)]
pub struct ChatSession {
    manager: ConnectionManager,
    orchestrator: TurnOrchestrator,
    credentials: ProviderCredentials,
}

impl ChatSession {
    /// Create a session
    pub fn new(
        manager: ConnectionManager,
        orchestrator: TurnOrchestrator,
        credentials: ProviderCredentials,
    ) -> Self {
        Self {
            manager,
            orchestrator,
            credentials,
        }
    }

    /// The connection manager backing this session
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Send `text` in a conversation and drive the turn to its end
    ///
    /// `on_event` sees every turn event together with the conversation as it
    /// should currently be displayed (including the pending placeholder and
    /// in-flight tool executions).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown connection or conversation and
    /// storage errors. Turn failures are not errors: they are saved as an
    /// assistant message and reported as [`TurnStatus::Failed`].
    pub async fn send_message<F>(
        &self,
        connection_id: &str,
        conversation_id: &str,
        text: &str,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<SendOutcome>
    where
        F: FnMut(&TurnEvent, &Conversation),
    {
        let connection = self.manager.get(connection_id).await?;
        let store = self.manager.conversations();
        let executions = self.manager.executions();

        let mut conversation = store.get(connection_id, conversation_id).await?;
        let history = conversation.history_for_provider();
        conversation.push(Message::user(text));
        let conversation = store.save(&conversation).await?;

        let input = TurnInput {
            connection,
            user_message: text.to_string(),
            history,
            enabled_tools: self.manager.enabled_tools(connection_id).await?,
            credentials: self.credentials.clone(),
        };

        let mut recorded: Vec<String> = Vec::new();
        let events = self.orchestrator.stream_turn(input, cancel);
        let driven = self
            .consume_events(connection_id, conversation, events, &mut recorded, &mut on_event)
            .await;

        let (conversation, status) = match driven {
            Ok(done) => done,
            Err(e) => {
                // Nothing saved references these executions.
                if let Err(cleanup) = executions.delete_many(connection_id, &recorded).await {
                    warn!("Failed to discard executions of a failed turn: {:#}", cleanup);
                }
                return Err(e);
            }
        };

        let status = match status {
            Some(status) => status,
            None => {
                let removed = executions.delete_many(connection_id, &recorded).await?;
                debug!("Turn cancelled, discarded {} executions", removed);
                TurnStatus::Cancelled
            }
        };

        info!(
            "Turn on conversation {} ended: {:?}",
            conversation.id, status
        );
        Ok(SendOutcome {
            conversation,
            status,
        })
    }

    /// Apply turn events to the execution log, the stored conversation and
    /// the displayed view
    ///
    /// Returns the conversation as saved and the terminal status, or `None`
    /// when the stream ended without one.
    async fn consume_events<F>(
        &self,
        connection_id: &str,
        mut conversation: Conversation,
        mut events: ReceiverStream<TurnEvent>,
        recorded: &mut Vec<String>,
        on_event: &mut F,
    ) -> Result<(Conversation, Option<TurnStatus>)>
    where
        F: FnMut(&TurnEvent, &Conversation),
    {
        let store = self.manager.conversations();
        let executions = self.manager.executions();

        let mut view = conversation.clone();
        view.push(Message::pending());
        let mut status = None;

        while let Some(event) = events.next().await {
            match &event {
                TurnEvent::ToolStart { execution } => {
                    recorded.push(execution.id.clone());
                    executions.upsert(connection_id, execution).await?;
                    let placeholder = view.messages.len().saturating_sub(1);
                    view.messages.insert(
                        placeholder,
                        Message::tool_execution(&execution.id, &execution.tool, ExecutionState::Pending),
                    );
                }
                TurnEvent::ToolEnd { execution, message } => {
                    executions.upsert(connection_id, execution).await?;
                    if let Some(slot) = view
                        .messages
                        .iter_mut()
                        .find(|m| m.execution_id() == Some(execution.id.as_str()))
                    {
                        *slot = message.clone();
                    }
                }
                TurnEvent::MessageComplete(outcome) => {
                    conversation
                        .messages
                        .extend(outcome.tool_execution_messages.iter().cloned());
                    conversation.push(outcome.assistant_message.clone());
                    conversation = store.save(&conversation).await?;
                    view = conversation.clone();
                    status = Some(TurnStatus::Completed);
                }
                TurnEvent::Error(message) => {
                    conversation.push(Message::assistant(message.clone()));
                    conversation = store.save(&conversation).await?;
                    view = conversation.clone();
                    status = Some(TurnStatus::Failed(message.clone()));
                }
                TurnEvent::Thinking | TurnEvent::Token(_) => {}
            }
            on_event(&event, &view);
        }

        Ok((conversation, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, ExecutionStatus, Tool};
    use crate::providers::ContentBlock;
    use crate::storage::StorageAdapter;
    use crate::test_utils::{
        credentials, memory_storage, FailingWriteStorage, MockExecutor, MockProvider,
    };
    use serde_json::json;
    use std::sync::Arc;

    async fn setup(
        provider: MockProvider,
        executor: MockExecutor,
    ) -> (ChatSession, Connection, Conversation) {
        let (session, connection, conversation, _) =
            setup_on(memory_storage(), provider, executor).await;
        (session, connection, conversation)
    }

    async fn setup_on(
        storage: Arc<dyn StorageAdapter>,
        provider: MockProvider,
        executor: MockExecutor,
    ) -> (ChatSession, Connection, Conversation, Arc<MockProvider>) {
        let manager = ConnectionManager::new(storage);
        let connection = manager
            .add(Connection::new("files", "http://localhost:9/mcp"))
            .await
            .unwrap();
        manager
            .set_tools(&connection.id, &[Tool::new("list_files", "List files")])
            .await
            .unwrap();
        let conversation = manager
            .conversations()
            .create(&connection.id, None)
            .await
            .unwrap();
        let provider = Arc::new(provider);
        let orchestrator = TurnOrchestrator::new(provider.clone(), Arc::new(executor));
        (
            ChatSession::new(manager, orchestrator, credentials()),
            connection,
            conversation,
            provider,
        )
    }

    fn list_files_call() -> ContentBlock {
        ContentBlock::ToolUse {
            id: "tu_1".to_string(),
            name: "list_files".to_string(),
            input: json!({}),
        }
    }

    #[tokio::test]
    async fn test_completed_turn_is_persisted_in_order() {
        let (session, connection, conversation) = setup(
            MockProvider::new(vec![
                MockProvider::blocks(vec![list_files_call()]),
                MockProvider::text("You have a.txt"),
            ]),
            MockExecutor::new().with_result("list_files", json!({"content": [{"text": "[\"a.txt\"]"}]})),
        )
        .await;

        let mut saw_pending = false;
        let outcome = session
            .send_message(
                &connection.id,
                &conversation.id,
                "List my files",
                &CancellationToken::new(),
                |_, view| saw_pending |= view.messages.iter().any(|m| m.is_pending()),
            )
            .await
            .unwrap();

        assert!(saw_pending);
        assert_eq!(outcome.status, TurnStatus::Completed);
        let stored = session
            .manager()
            .conversations()
            .get(&connection.id, &conversation.id)
            .await
            .unwrap();
        assert_eq!(stored.messages.len(), 3);
        assert_eq!(stored.messages[0].text(), Some("List my files"));
        assert!(stored.messages[1].execution_id().is_some());
        assert_eq!(stored.messages[2].text(), Some("You have a.txt"));
        assert_eq!(stored.title, "List my files");

        let log = session.manager().executions().list(&connection.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, ExecutionStatus::Success);
        assert_eq!(Some(log[0].id.as_str()), stored.messages[1].execution_id());
    }

    #[tokio::test]
    async fn test_failed_turn_saves_one_error_message() {
        let (session, connection, conversation) =
            setup(MockProvider::new(vec![]).with_status_error(500), MockExecutor::new()).await;

        let outcome = session
            .send_message(
                &connection.id,
                &conversation.id,
                "hello",
                &CancellationToken::new(),
                |_, _| {},
            )
            .await
            .unwrap();

        assert!(matches!(outcome.status, TurnStatus::Failed(_)));
        let messages = &outcome.conversation.messages;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].text().unwrap().contains("having issues"));
        assert!(messages.iter().all(|m| !m.is_pending()));
    }

    #[tokio::test]
    async fn test_cancelled_turn_keeps_only_user_message() {
        let cancel = CancellationToken::new();
        let (session, connection, conversation) = setup(
            MockProvider::new(vec![
                MockProvider::blocks(vec![list_files_call()]),
                MockProvider::text("never"),
            ]),
            MockExecutor::new().cancel_on_call(cancel.clone()),
        )
        .await;

        let outcome = session
            .send_message(&connection.id, &conversation.id, "go", &cancel, |_, _| {})
            .await
            .unwrap();

        assert_eq!(outcome.status, TurnStatus::Cancelled);
        let stored = session
            .manager()
            .conversations()
            .get(&connection.id, &conversation.id)
            .await
            .unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].text(), Some("go"));
        assert!(session
            .manager()
            .executions()
            .list(&connection.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_history_excludes_new_message_and_tool_entries() {
        let (session, connection, conversation) = setup(
            MockProvider::new(vec![MockProvider::text("one"), MockProvider::text("two")]),
            MockExecutor::new(),
        )
        .await;
        let cancel = CancellationToken::new();

        session
            .send_message(&connection.id, &conversation.id, "first", &cancel, |_, _| {})
            .await
            .unwrap();
        let outcome = session
            .send_message(&connection.id, &conversation.id, "second", &cancel, |_, _| {})
            .await
            .unwrap();

        let texts: Vec<&str> = outcome
            .conversation
            .messages
            .iter()
            .filter_map(|m| m.text())
            .collect();
        assert_eq!(texts, vec!["first", "one", "second", "two"]);
    }

    #[tokio::test]
    async fn test_storage_failure_mid_turn_discards_recorded_executions() {
        // First execution write (tool start) succeeds, the second (tool end) fails.
        let storage: Arc<dyn StorageAdapter> = Arc::new(FailingWriteStorage::new("executions:", 2));
        let (session, connection, conversation, _) = setup_on(
            storage,
            MockProvider::new(vec![
                MockProvider::blocks(vec![list_files_call()]),
                MockProvider::text("You have a.txt"),
            ]),
            MockExecutor::new(),
        )
        .await;

        let result = session
            .send_message(
                &connection.id,
                &conversation.id,
                "List my files",
                &CancellationToken::new(),
                |_, _| {},
            )
            .await;

        assert!(result.is_err());
        assert!(session
            .manager()
            .executions()
            .list(&connection.id)
            .await
            .unwrap()
            .is_empty());
        let stored = session
            .manager()
            .conversations()
            .get(&connection.id, &conversation.id)
            .await
            .unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert!(stored.execution_ids().is_empty());
    }

    #[tokio::test]
    async fn test_disabling_tool_between_turns() {
        let (session, connection, conversation, provider) = setup_on(
            memory_storage(),
            MockProvider::new(vec![
                MockProvider::blocks(vec![list_files_call()]),
                MockProvider::text("You have a.txt"),
                MockProvider::text("I can no longer list files."),
            ]),
            MockExecutor::new().with_result("list_files", json!({"content": [{"text": "[\"a.txt\"]"}]})),
        )
        .await;
        let cancel = CancellationToken::new();

        session
            .send_message(&connection.id, &conversation.id, "List my files", &cancel, |_, _| {})
            .await
            .unwrap();
        session
            .manager()
            .set_tool_enabled(&connection.id, "list_files", false)
            .await
            .unwrap();
        let outcome = session
            .send_message(&connection.id, &conversation.id, "Again please", &cancel, |_, _| {})
            .await
            .unwrap();
        assert_eq!(outcome.status, TurnStatus::Completed);

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        let offered = |i: usize| -> Vec<String> {
            requests[i].tools.iter().map(|t| t.name.clone()).collect()
        };
        assert!(offered(0).contains(&"list_files".to_string()));
        assert!(!offered(2).contains(&"list_files".to_string()));

        let log = session.manager().executions().list(&connection.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, ExecutionStatus::Success);
        let enablement = session.manager().enablement(&connection.id).await.unwrap();
        assert_eq!(enablement.status_label(&log[0]), "success (now disabled)");
        assert_eq!(outcome.conversation.messages.len(), 5);
    }
}
