//! `conversations` subcommands

use colored::Colorize;
use prettytable::{format, Table};

use super::{short_id, truncate, AppContext};
use crate::cli::ConversationCommand;
use crate::error::Result;
use crate::model::{Author, Connection, Conversation, ExecutionState, Message, MessageBody};

/// Handle conversation commands
pub async fn handle_conversations(ctx: &AppContext, command: ConversationCommand) -> Result<()> {
    match command {
        ConversationCommand::List { connection } => {
            let connection = ctx.connection(&connection).await?;
            let mut conversations = ctx.manager.conversations().list(&connection.id).await?;
            if conversations.is_empty() {
                println!("{}", "No conversations found.".yellow());
                return Ok(());
            }
            conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);
            for conversation in &conversations {
                table.add_row(prettytable::row![
                    short_id(&conversation.id).cyan(),
                    truncate(&conversation.title, 40),
                    conversation.messages.len(),
                    conversation.updated_at.format("%Y-%m-%d %H:%M")
                ]);
            }

            println!("\nConversations on {}:", connection.name.bold());
            table.printstd();
            println!();
            println!(
                "Use {} to resume one.",
                format!("mcpconnect chat {} -C <ID>", connection.name).cyan()
            );
            println!();
            Ok(())
        }
        ConversationCommand::Show { connection, id } => {
            let connection = ctx.connection(&connection).await?;
            let conversation = ctx.conversation(&connection, &id).await?;
            println!("\n{}\n", conversation.title.bold());
            print_history(ctx, &connection, &conversation).await?;
            println!();
            Ok(())
        }
        ConversationCommand::Delete { connection, id } => {
            let connection = ctx.connection(&connection).await?;
            let conversation = ctx.conversation(&connection, &id).await?;
            let removed = ctx
                .manager
                .conversations()
                .delete(&connection.id, &conversation.id)
                .await?;
            println!(
                "{}",
                format!(
                    "Deleted conversation {} ({} tool executions removed)",
                    short_id(&conversation.id),
                    removed
                )
                .green()
            );
            Ok(())
        }
        ConversationCommand::Clear { connection } => {
            let connection = ctx.connection(&connection).await?;
            let removed = ctx.manager.conversations().clear_all(&connection.id).await?;
            println!(
                "{}",
                format!(
                    "Cleared all conversations on {} ({} tool executions removed)",
                    connection.name, removed
                )
                .green()
            );
            Ok(())
        }
    }
}

/// Print one message the way the chat loop does
///
/// `status` overrides the status shown for tool executions (for the
/// "now disabled" annotation).
pub fn print_message(message: &Message, status: Option<String>) {
    match &message.body {
        MessageBody::Text { text } => match message.author {
            Author::User => println!("{} {}", "you>".bold().blue(), text),
            Author::Assistant => println!("{} {}", "assistant>".bold().green(), text),
        },
        MessageBody::ToolExecution {
            tool_name, state, ..
        } => {
            let status = status.unwrap_or_else(|| state.status().to_string());
            let line = format!("  [tool] {} ({})", tool_name, status);
            match state {
                ExecutionState::Pending => println!("{}", line.dimmed()),
                ExecutionState::Success { .. } => println!("{}", line.cyan()),
                ExecutionState::Error { error } => {
                    println!("{}", line.red());
                    println!("{}", format!("         {}", error).red());
                }
            }
        }
        MessageBody::Pending => println!("{}", "assistant> thinking...".dimmed()),
    }
}

/// Print a whole conversation with execution statuses from the log
pub async fn print_history(
    ctx: &AppContext,
    connection: &Connection,
    conversation: &Conversation,
) -> Result<()> {
    let enablement = ctx.manager.enablement(&connection.id).await?;
    let executions = ctx.manager.executions().list(&connection.id).await?;
    for message in &conversation.messages {
        let execution = message
            .execution_id()
            .and_then(|id| executions.iter().find(|e| e.id == id));
        print_message(message, execution.map(|e| enablement.status_label(e)));
    }
    Ok(())
}
