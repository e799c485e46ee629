//! Chat sessions
//!
//! Wraps the turn orchestrator with the bookkeeping a front end needs:
//! persisting the user message, tracking executions while they run, and
//! committing or discarding the turn when it ends.

pub mod session;

pub use session::{ChatSession, SendOutcome, TurnStatus};
