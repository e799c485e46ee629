//! Streaming turn events
//!
//! [`TurnOrchestrator::stream_turn`] runs a turn on a background task and
//! yields its progress as a stream. Dropping the stream cancels the turn.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::classify::user_facing_message;
use super::orchestrator::{EventSink, TurnInput, TurnOrchestrator, TurnOutcome};
use crate::error::is_cancelled;
use crate::model::{Message, ToolExecution};

const EVENT_BUFFER: usize = 32;

/// Progress of a running turn
///
/// Every stream ends with exactly one `MessageComplete` or `Error`, unless
/// the turn was cancelled, in which case it simply ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TurnEvent {
    /// The first provider call is in flight
    Thinking,
    /// Assistant text became available
    Token(String),
    /// A tool invocation started; the execution is pending
    ToolStart {
        /// Pending audit record
        execution: ToolExecution,
    },
    /// A tool invocation finished
    ToolEnd {
        /// Final audit record
        execution: ToolExecution,
        /// Message to display for the invocation
        message: Message,
    },
    /// The turn completed
    MessageComplete(TurnOutcome),
    /// The turn failed; carries the user-facing text
    Error(String),
}

impl TurnEvent {
    /// Returns true for `MessageComplete` and `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MessageComplete(_) | Self::Error(_))
    }
}

impl TurnOrchestrator {
    /// Run a turn in the background and stream its events
    ///
    /// Cancelling `cancel` or dropping the returned stream stops the turn
    /// before its next network call.
    pub fn stream_turn(
        &self,
        input: TurnInput,
        cancel: &CancellationToken,
    ) -> ReceiverStream<TurnEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let token = cancel.child_token();
        let orchestrator = self.clone();

        tokio::spawn(async move {
            let sink = EventSink::channel(tx.clone(), token.clone());
            let result = orchestrator.drive(input, &sink, &token).await;

            let terminal = match result {
                Ok(_) if token.is_cancelled() => None,
                Ok(outcome) => Some(TurnEvent::MessageComplete(outcome)),
                Err(e) if is_cancelled(&e) || token.is_cancelled() => {
                    debug!("Turn cancelled");
                    None
                }
                Err(e) => {
                    warn!("Turn failed: {:#}", e);
                    Some(TurnEvent::Error(user_facing_message(&e)))
                }
            };

            if let Some(event) = terminal {
                let _ = tx.send(event).await;
            }
        });

        ReceiverStream::new(rx)
    }
}
