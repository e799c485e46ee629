//! Tool execution audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::{ExecutionState, ExecutionStatus, ToolOutput};

/// The request half of an execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Tool name
    pub tool: String,
    /// Arguments as supplied by the provider
    pub arguments: serde_json::Value,
    /// When the request was issued
    pub timestamp: DateTime<Utc>,
}

/// The response half of an execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    /// Whether the tool succeeded
    pub success: bool,
    /// Tool result
    pub result: ToolOutput,
    /// When the response arrived
    pub timestamp: DateTime<Utc>,
}

/// Audit record of one tool invocation
///
/// Created pending and mutated in place when the invocation finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    /// Unique identifier
    pub id: String,
    /// Tool name
    pub tool: String,
    /// Current status
    pub status: ExecutionStatus,
    /// Wall-clock duration in milliseconds (0 while pending)
    pub duration_ms: u64,
    /// When the execution started
    pub timestamp: DateTime<Utc>,
    /// Request details
    pub request: ExecutionRequest,
    /// Response details, once successful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ExecutionResponse>,
    /// Error message, once failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecution {
    /// Creates a pending execution record
    pub fn pending(tool: impl Into<String>, arguments: serde_json::Value) -> Self {
        let tool = tool.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tool: tool.clone(),
            status: ExecutionStatus::Pending,
            duration_ms: 0,
            timestamp: now,
            request: ExecutionRequest {
                tool,
                arguments,
                timestamp: now,
            },
            response: None,
            error: None,
        }
    }

    /// Marks the execution successful
    pub fn succeed(&mut self, result: ToolOutput, elapsed: Duration) {
        self.status = ExecutionStatus::Success;
        self.duration_ms = elapsed.as_millis() as u64;
        self.response = Some(ExecutionResponse {
            success: true,
            result,
            timestamp: Utc::now(),
        });
        self.error = None;
    }

    /// Marks the execution failed
    pub fn fail(&mut self, error: impl Into<String>, elapsed: Duration) {
        self.status = ExecutionStatus::Error;
        self.duration_ms = elapsed.as_millis() as u64;
        self.response = None;
        self.error = Some(error.into());
    }

    /// Message-level view of this record
    pub fn state(&self) -> ExecutionState {
        match self.status {
            ExecutionStatus::Pending => ExecutionState::Pending,
            ExecutionStatus::Success => ExecutionState::Success {
                result: self
                    .response
                    .as_ref()
                    .map(|r| r.result.clone())
                    .unwrap_or_else(|| ToolOutput::new(serde_json::Value::Null)),
            },
            ExecutionStatus::Error => ExecutionState::Error {
                error: self
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            },
        }
    }
}
