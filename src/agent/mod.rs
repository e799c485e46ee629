//! Turn orchestration
//!
//! This module runs one user turn against the provider and the connection's
//! tools, either to completion ([`TurnOrchestrator::run_turn`]) or as a
//! stream of [`TurnEvent`]s ([`TurnOrchestrator::stream_turn`]).

pub mod classify;
pub mod orchestrator;
pub mod stream;

pub use classify::{classify, user_facing_message, ErrorCategory};
pub use orchestrator::{
    TurnInput, TurnOrchestrator, TurnOutcome, EMPTY_RESPONSE_TEXT, TOOL_FALLBACK_TEXT,
};
pub use stream::TurnEvent;
