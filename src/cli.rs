//! Command-line interface definition for mcpconnect
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// mcpconnect - chat with a language model that can call MCP server tools
#[derive(Parser, Debug, Clone)]
#[command(name = "mcpconnect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the model from config
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Use in-memory storage (nothing is persisted)
    #[arg(long, global = true)]
    pub memory: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat on a connection
    Chat {
        /// Connection id or name
        connection: String,

        /// Conversation id to resume (defaults to the most recent one)
        #[arg(short = 'C', long)]
        conversation: Option<String>,

        /// Start a new conversation
        #[arg(short, long, conflicts_with = "conversation")]
        new: bool,
    },

    /// Manage tool-server connections
    Connections {
        /// Connection subcommand
        #[command(subcommand)]
        command: ConnectionCommand,
    },

    /// List and toggle tools of a connection
    Tools {
        /// Tool subcommand
        #[command(subcommand)]
        command: ToolCommand,
    },

    /// Manage conversations of a connection
    Conversations {
        /// Conversation subcommand
        #[command(subcommand)]
        command: ConversationCommand,
    },

    /// Inspect the tool execution log
    Executions {
        /// Execution subcommand
        #[command(subcommand)]
        command: ExecutionCommand,
    },

    /// Export and import share links
    Share {
        /// Share subcommand
        #[command(subcommand)]
        command: ShareCommand,
    },
}

/// Connection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConnectionCommand {
    /// List connections
    List,

    /// Add a connection
    Add {
        /// Display name
        name: String,

        /// Tool-server URL (http or https)
        url: String,

        /// Bearer token
        #[arg(long, conflicts_with_all = ["api_key", "basic"])]
        bearer: Option<String>,

        /// API key sent in `--api-key-header`
        #[arg(long)]
        api_key: Option<String>,

        /// Header carrying `--api-key`
        #[arg(long, default_value = "X-API-Key")]
        api_key_header: String,

        /// Basic credentials as `user:password`
        #[arg(long, conflicts_with = "api_key")]
        basic: Option<String>,

        /// Request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Retries after a failed request
        #[arg(long)]
        retries: Option<u32>,

        /// Skip fetching the tool catalog
        #[arg(long)]
        no_refresh: bool,
    },

    /// Remove a connection with all its conversations and executions
    Remove {
        /// Connection id or name
        connection: String,
    },

    /// Re-fetch the tool catalog from the server
    RefreshTools {
        /// Connection id or name
        connection: String,
    },
}

/// Tool subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ToolCommand {
    /// List tools with their enabled state
    List {
        /// Connection id or name
        connection: String,
    },

    /// Offer a tool on future turns
    Enable {
        /// Connection id or name
        connection: String,
        /// Tool id or name
        tool: String,
    },

    /// Stop offering a tool on future turns
    Disable {
        /// Connection id or name
        connection: String,
        /// Tool id or name
        tool: String,
    },
}

/// Conversation subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConversationCommand {
    /// List conversations
    List {
        /// Connection id or name
        connection: String,
    },

    /// Print a conversation
    Show {
        /// Connection id or name
        connection: String,
        /// Conversation id (prefix accepted)
        id: String,
    },

    /// Delete a conversation and its executions
    Delete {
        /// Connection id or name
        connection: String,
        /// Conversation id (prefix accepted)
        id: String,
    },

    /// Delete every conversation of a connection
    Clear {
        /// Connection id or name
        connection: String,
    },
}

/// Execution subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ExecutionCommand {
    /// List recorded tool executions
    List {
        /// Connection id or name
        connection: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Share subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ShareCommand {
    /// Print a share link for a conversation
    Export {
        /// Connection id or name
        connection: String,
        /// Conversation id (prefix accepted)
        id: String,
    },

    /// Import a share link as a new connection
    Import {
        /// Share link or encoded payload
        link: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Configuration path, falling back to [`DEFAULT_CONFIG_PATH`]
    pub fn config_path(&self) -> &str {
        self.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    }
}
