//! Special commands parser for interactive chat
//!
//! Commands are prefixed with `/` and are case-insensitive. Anything else is
//! sent to the model as a user message.

use colored::Colorize;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Commands handled by the chat loop itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show available commands
    Help,
    /// Start a new conversation, optionally titled
    New(Option<String>),
    /// List tools with their enabled state
    Tools,
    /// Offer a tool on future turns
    Enable(String),
    /// Stop offering a tool on future turns
    Disable(String),
    /// Print a share link for the current conversation
    Share,
    /// Show the current connection and conversation
    Status,
    /// Leave the chat
    Exit,
    /// Not a special command
    None,
}

/// Parse a line of chat input
///
/// # Errors
///
/// Returns `CommandError` for an unknown `/command` or a missing argument.
///
/// # Examples
///
/// ```
/// use mcpconnect::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/exit").unwrap(), SpecialCommand::Exit);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts
        .next()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    let required = |usage: &str| {
        arg.clone().ok_or_else(|| CommandError::MissingArgument {
            command: command.clone(),
            usage: usage.to_string(),
        })
    };

    match command.as_str() {
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/new" => Ok(SpecialCommand::New(arg.clone())),
        "/tools" => Ok(SpecialCommand::Tools),
        "/enable" => Ok(SpecialCommand::Enable(required("/enable <tool>")?)),
        "/disable" => Ok(SpecialCommand::Disable(required("/disable <tool>")?)),
        "/share" => Ok(SpecialCommand::Share),
        "/status" => Ok(SpecialCommand::Status),
        "/exit" | "/quit" | "/q" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(command.clone())),
    }
}

/// Print the special command reference
pub fn print_help() {
    println!("\n{}", "Chat commands:".bold());
    let rows = [
        ("/new [title]", "start a new conversation"),
        ("/tools", "list tools and whether they are enabled"),
        ("/enable <tool>", "offer a tool on future turns"),
        ("/disable <tool>", "stop offering a tool on future turns"),
        ("/share", "print a share link for this conversation"),
        ("/status", "show the current connection and conversation"),
        ("/exit", "leave the chat"),
    ];
    for (command, description) in rows {
        println!("  {:<18} {}", command.cyan(), description);
    }
    println!("\nPress Ctrl-C during a reply to cancel it.\n");
}
