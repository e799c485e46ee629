//! mcpconnect - chat client library for MCP tool servers
//!
//! A hosted language model (the Anthropic Messages API) answers user
//! messages and may call tools exposed by MCP servers over Streamable HTTP.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Turn orchestration (provider call, tool execution, follow-up)
//! - `chat`: Chat sessions that persist turns
//! - `connections`: Connections and their per-connection state
//! - `history`: Conversation and execution log storage
//! - `mcp`: MCP JSON-RPC client and tool execution seams
//! - `providers`: Provider abstraction and the Anthropic implementation
//! - `share`: Share-link encoding and import
//! - `storage`: Key-value storage adapters (SQLite, in-memory)
//! - `tools`: System tools and tool enablement
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line front end
//!
//! # Example
//!
//! ```no_run
//! use mcpconnect::cli::Cli;
//! use mcpconnect::commands::AppContext;
//! use mcpconnect::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_args();
//!     let config = Config::load(cli.config_path(), &cli)?;
//!     config.validate()?;
//!
//!     let ctx = AppContext::new(config)?;
//!     for connection in ctx.manager.list().await? {
//!         println!("{}", connection.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod connections;
pub mod error;
pub mod history;
pub mod mcp;
pub mod model;
pub mod providers;
pub mod share;
pub mod storage;
pub mod tools;

// Re-export commonly used types
pub use agent::{TurnEvent, TurnInput, TurnOrchestrator, TurnOutcome};
pub use chat::ChatSession;
pub use config::Config;
pub use connections::ConnectionManager;
pub use error::{McpConnectError, Result};

#[cfg(test)]
pub mod test_utils;
