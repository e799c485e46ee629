//! Turn orchestrator
//!
//! Drives one user turn to completion:
//! - rejects the turn when no API key is configured
//! - issues the first provider call with history, the user message and the
//!   enabled tool declarations
//! - runs every requested tool strictly in block order
//! - issues a single follow-up call carrying all tool results
//! - returns a non-empty assistant message plus one message per tool call
//!
//! Tool failures become data (failed executions and `is_error` results).
//! A failed follow-up call degrades to fallback text.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{is_cancelled, McpConnectError, Result};
use crate::mcp::ToolExecutor;
use crate::model::{Author, Connection, Message, ProviderCredentials, Tool, ToolExecution};
use crate::providers::{
    ContentBlock, Provider, ProviderMessage, ProviderRequest, ProviderResponse, ToolDeclaration,
};

use super::stream::TurnEvent;

/// Final text when tools ran and neither call produced any text
pub const TOOL_FALLBACK_TEXT: &str = "Tool executed successfully.";

/// Final text when the provider returned no text and called no tools
pub const EMPTY_RESPONSE_TEXT: &str = "No response from assistant";

/// Everything one turn needs
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Connection whose tools are invoked
    pub connection: Connection,
    /// The new user message
    pub user_message: String,
    /// Prior conversation; non-text messages are skipped
    pub history: Vec<Message>,
    /// Tools offered to the provider
    pub enabled_tools: Vec<Tool>,
    /// Provider credentials and sampling settings
    pub credentials: ProviderCredentials,
}

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Final assistant reply; never empty, never pending
    pub assistant_message: Message,
    /// One message per tool call, in call order
    pub tool_execution_messages: Vec<Message>,
    /// Final audit records, in call order
    pub executions: Vec<ToolExecution>,
}

/// Destination for turn events
///
/// A closed channel means nobody is listening any more; the turn is
/// cancelled so no further network calls are made.
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<TurnEvent>>,
    on_closed: CancellationToken,
}

impl EventSink {
    pub(crate) fn none() -> Self {
        Self {
            tx: None,
            on_closed: CancellationToken::new(),
        }
    }

    pub(crate) fn channel(tx: mpsc::Sender<TurnEvent>, on_closed: CancellationToken) -> Self {
        Self {
            tx: Some(tx),
            on_closed,
        }
    }

    pub(crate) async fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                debug!("Turn event receiver dropped, cancelling turn");
                self.on_closed.cancel();
            }
        }
    }
}

/// Runs turns against a provider and a tool executor
///
/// Cheap to clone; clones share the provider and executor.
#[derive(Clone)]
pub struct TurnOrchestrator {
    provider: Arc<dyn Provider>,
    executor: Arc<dyn ToolExecutor>,
}

impl TurnOrchestrator {
    /// Create an orchestrator
    pub fn new(provider: Arc<dyn Provider>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self { provider, executor }
    }

    /// Run one turn to completion
    ///
    /// # Errors
    ///
    /// - `Config` when the credentials carry no API key
    /// - `Provider` / `ProviderTransport` when the first call fails
    /// - `Cancelled` when `cancel` fires before the turn completes
    pub async fn run_turn(
        &self,
        input: TurnInput,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        self.drive(input, &EventSink::none(), cancel).await
    }

    pub(crate) async fn drive(
        &self,
        input: TurnInput,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let api_key = input
            .credentials
            .api_key()
            .ok_or_else(|| {
                McpConnectError::Config(
                    "No API key configured. Please configure your API key \
                     (provider.api_key or MCPCONNECT_API_KEY)."
                        .to_string(),
                )
            })?
            .to_string();

        let mut messages = translate_history(&input.history);
        messages.push(ProviderMessage::user(input.user_message.clone()));
        let tools = declarations(&input.enabled_tools);

        let request = ProviderRequest {
            model: input.credentials.model.clone(),
            max_tokens: input.credentials.max_tokens,
            temperature: input.credentials.temperature,
            messages,
            tools,
        };

        info!(
            "Starting turn on {}: {} history messages, {} tools",
            input.connection.name,
            input.history.len(),
            request.tools.len()
        );
        sink.emit(TurnEvent::Thinking).await;

        let first = self.call_provider(&api_key, &request, cancel).await?;

        let mut response_text = String::new();
        let mut tool_results = Vec::new();
        let mut executions = Vec::new();
        let mut tool_messages = Vec::new();

        for block in &first.content {
            match block {
                ContentBlock::Text { text } => {
                    response_text.push_str(text);
                    sink.emit(TurnEvent::Token(text.clone())).await;
                }
                ContentBlock::ToolUse { id, name, input: arguments } => {
                    let (execution, result) = self
                        .execute_tool(&input.connection, id, name, arguments, sink, cancel)
                        .await?;
                    let message =
                        Message::tool_execution(&execution.id, name, execution.state());
                    sink.emit(TurnEvent::ToolEnd {
                        execution: execution.clone(),
                        message: message.clone(),
                    })
                    .await;
                    tool_results.push(result);
                    executions.push(execution);
                    tool_messages.push(message);
                }
                _ => {}
            }
        }

        let final_text = if tool_results.is_empty() {
            if response_text.trim().is_empty() {
                warn!("Provider returned no text and no tool calls");
                EMPTY_RESPONSE_TEXT.to_string()
            } else {
                response_text
            }
        } else {
            self.follow_up(&api_key, request, &first, tool_results, response_text, sink, cancel)
                .await?
        };

        info!(
            "Turn completed on {} with {} tool executions",
            input.connection.name,
            executions.len()
        );

        Ok(TurnOutcome {
            assistant_message: Message::assistant(final_text),
            tool_execution_messages: tool_messages,
            executions,
        })
    }

    async fn execute_tool(
        &self,
        connection: &Connection,
        call_id: &str,
        name: &str,
        arguments: &serde_json::Value,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<(ToolExecution, ContentBlock)> {
        ensure_active(cancel)?;

        let mut execution = ToolExecution::pending(name, arguments.clone());
        sink.emit(TurnEvent::ToolStart {
            execution: execution.clone(),
        })
        .await;
        debug!("Executing tool {} (call {})", name, call_id);

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(McpConnectError::Cancelled.into()),
            outcome = self.executor.execute(connection, name, arguments.clone()) => outcome,
        };

        let result = match outcome {
            Ok(output) => {
                let content = output.format_for_provider();
                execution.succeed(output, started.elapsed());
                ContentBlock::tool_result(call_id, content)
            }
            Err(e) => {
                let error = McpConnectError::ToolExecution(e.to_string());
                warn!("{}", error);
                execution.fail(e.to_string(), started.elapsed());
                ContentBlock::tool_error(call_id, format!("Error: {}", e))
            }
        };
        Ok((execution, result))
    }

    /// Second provider call carrying the tool results
    ///
    /// Text fallback: follow-up text, then first-call text, then
    /// [`TOOL_FALLBACK_TEXT`].
    #[allow(clippy::too_many_arguments)]
    async fn follow_up(
        &self,
        api_key: &str,
        mut request: ProviderRequest,
        first: &ProviderResponse,
        tool_results: Vec<ContentBlock>,
        first_text: String,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let echo: Vec<ContentBlock> = first
            .content
            .iter()
            .filter(|b| !matches!(b, ContentBlock::Other))
            .cloned()
            .collect();
        request
            .messages
            .push(ProviderMessage::blocks("assistant", echo));
        request
            .messages
            .push(ProviderMessage::blocks("user", tool_results));

        let fallback = || {
            if first_text.trim().is_empty() {
                TOOL_FALLBACK_TEXT.to_string()
            } else {
                first_text.clone()
            }
        };

        match self.call_provider(api_key, &request, cancel).await {
            Ok(response) => {
                let text = response.text();
                if text.trim().is_empty() {
                    Ok(fallback())
                } else {
                    sink.emit(TurnEvent::Token(text.clone())).await;
                    Ok(text)
                }
            }
            Err(e) if is_cancelled(&e) => Err(e),
            Err(e) => {
                warn!("{}", McpConnectError::FollowUp(e.to_string()));
                Ok(fallback())
            }
        }
    }

    async fn call_provider(
        &self,
        api_key: &str,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse> {
        ensure_active(cancel)?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(McpConnectError::Cancelled.into()),
            response = self.provider.complete(api_key, request) => response,
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(McpConnectError::Cancelled.into());
    }
    Ok(())
}

/// Text messages in provider format; everything else is skipped
fn translate_history(history: &[Message]) -> Vec<ProviderMessage> {
    history
        .iter()
        .filter_map(|m| {
            let text = m.text()?;
            Some(match m.author {
                Author::User => ProviderMessage::user(text),
                Author::Assistant => ProviderMessage::assistant(text),
            })
        })
        .collect()
}

fn declarations(tools: &[Tool]) -> Vec<ToolDeclaration> {
    tools
        .iter()
        .map(|t| ToolDeclaration {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.declaration_schema(),
        })
        .collect()
}
