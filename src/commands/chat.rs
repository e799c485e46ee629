//! Interactive chat mode handler.
//!
//! Runs a readline loop on one connection and conversation. Each line is
//! either a special command or a user message sent through the
//! [`ChatSession`](crate::chat::ChatSession); Ctrl-C while a reply is being
//! produced cancels that turn only.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;

use super::conversations::{print_history, print_message};
use super::special_commands::{parse_special_command, print_help, SpecialCommand};
use super::{short_id, share, tools, AppContext};
use crate::agent::{user_facing_message, TurnEvent};
use crate::chat::TurnStatus;
use crate::error::Result;
use crate::model::{Connection, Conversation};

/// Start interactive chat
///
/// Resumes `conversation` when given, starts a new one when `new` is set,
/// and otherwise resumes the most recently updated conversation.
pub async fn run_chat(
    ctx: &AppContext,
    connection: &str,
    conversation: Option<String>,
    new: bool,
) -> Result<()> {
    let connection = ctx.connection(connection).await?;
    ensure_tool_catalog(ctx, &connection).await;

    let store = ctx.manager.conversations();
    let mut conversation = match (conversation, new) {
        (_, true) => store.create(&connection.id, None).await?,
        (Some(id), false) => ctx.conversation(&connection, &id).await?,
        (None, false) => store.ensure_default(&connection.id).await?,
    };

    let watched = connection.id.clone();
    let subscription = ctx.manager.subscribe(move |change| {
        if change.connection_id == watched {
            tracing::debug!("Disabled tools now: {:?}", change.disabled);
        }
        Ok(())
    });

    print_welcome_banner(&connection, &conversation);
    print_history(ctx, &connection, &conversation).await?;

    let mut rl = DefaultEditor::new()?;
    let prompt = format!("{} ", "you>".bold().blue());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                let command = match parse_special_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e.to_string().red());
                        continue;
                    }
                };

                match command {
                    SpecialCommand::Help => print_help(),
                    SpecialCommand::New(title) => {
                        conversation = store.create(&connection.id, title.as_deref()).await?;
                        println!(
                            "{}",
                            format!(
                                "Started conversation \"{}\" ({})",
                                conversation.title,
                                short_id(&conversation.id)
                            )
                            .green()
                        );
                    }
                    SpecialCommand::Tools => tools::print_tools(ctx, &connection).await?,
                    SpecialCommand::Enable(tool) => {
                        report(tools::set_enabled(ctx, &connection, &tool, true).await)
                    }
                    SpecialCommand::Disable(tool) => {
                        report(tools::set_enabled(ctx, &connection, &tool, false).await)
                    }
                    SpecialCommand::Share => {
                        match share::export_url(ctx, &connection, &conversation).await {
                            Ok(url) => println!("{}", url),
                            Err(e) => eprintln!("{}", user_facing_message(&e).red()),
                        }
                    }
                    SpecialCommand::Status => print_status(ctx, &connection, &conversation).await?,
                    SpecialCommand::Exit => break,
                    SpecialCommand::None => {
                        if let Some(updated) = send(ctx, &connection, &conversation, trimmed).await? {
                            conversation = updated;
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    subscription.unsubscribe();
    println!("Goodbye!");
    Ok(())
}

/// Send one message, cancelling the turn on Ctrl-C
///
/// Returns the persisted conversation, or `None` when the turn could not
/// start.
async fn send(
    ctx: &AppContext,
    connection: &Connection,
    conversation: &Conversation,
    text: &str,
) -> Result<Option<Conversation>> {
    let cancel = CancellationToken::new();
    let mut printed: Option<String> = None;

    let turn = ctx.session.send_message(
        &connection.id,
        &conversation.id,
        text,
        &cancel,
        |event, _view| render_event(event, &mut printed),
    );
    tokio::pin!(turn);

    let result = loop {
        tokio::select! {
            result = &mut turn => break result,
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                println!("{}", "cancelling...".dimmed());
                cancel.cancel();
            }
        }
    };

    match result {
        Ok(outcome) => {
            if outcome.status == TurnStatus::Cancelled {
                println!("{}", "Cancelled.".yellow());
            }
            println!();
            Ok(Some(outcome.conversation))
        }
        Err(e) => {
            eprintln!("{}\n", user_facing_message(&e).red());
            Ok(None)
        }
    }
}

fn render_event(event: &TurnEvent, printed: &mut Option<String>) {
    match event {
        TurnEvent::Thinking => println!("{}", "thinking...".dimmed()),
        TurnEvent::Token(text) => {
            println!("{} {}", "assistant>".bold().green(), text);
            *printed = Some(text.clone());
        }
        TurnEvent::ToolStart { execution } => {
            println!("{}", format!("  [tool] {} (running)", execution.tool).dimmed())
        }
        TurnEvent::ToolEnd { message, .. } => print_message(message, None),
        TurnEvent::MessageComplete(outcome) => {
            let text = outcome.assistant_message.text();
            if text.is_some() && text != printed.as_deref() {
                print_message(&outcome.assistant_message, None);
            }
        }
        TurnEvent::Error(message) => eprintln!("{}", message.red()),
    }
}

/// Fetch the tool catalog once if it has never been fetched
async fn ensure_tool_catalog(ctx: &AppContext, connection: &Connection) {
    match ctx.manager.tools(&connection.id).await {
        Ok(tools) if !tools.is_empty() => {}
        _ => {
            if let Err(e) = ctx
                .manager
                .refresh_tools(&connection.id, ctx.mcp.as_ref())
                .await
            {
                eprintln!(
                    "{}",
                    format!(
                        "Could not reach {} ({}); only system tools are available.",
                        connection.name, e
                    )
                    .yellow()
                );
            }
        }
    }
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("{}", user_facing_message(&e).red());
    }
}

fn print_welcome_banner(connection: &Connection, conversation: &Conversation) {
    println!();
    println!(
        "{} {} ({})",
        "Connected to".bold(),
        connection.name.cyan(),
        connection.url
    );
    println!(
        "{} {} ({})",
        "Conversation:".bold(),
        conversation.title,
        short_id(&conversation.id)
    );
    println!("Type {} for commands, {} to leave.\n", "/help".cyan(), "/exit".cyan());
}

async fn print_status(
    ctx: &AppContext,
    connection: &Connection,
    conversation: &Conversation,
) -> Result<()> {
    let enablement = ctx.manager.enablement(&connection.id).await?;
    println!("Connection:   {} ({})", connection.name, connection.url);
    println!(
        "Conversation: {} ({}, {} messages)",
        conversation.title,
        short_id(&conversation.id),
        conversation.messages.len()
    );
    println!(
        "Tools:        {} of {} enabled",
        enablement.enabled_tools().len(),
        enablement.tools().len()
    );
    println!("Model:        {}\n", ctx.config.provider.model);
    Ok(())
}
