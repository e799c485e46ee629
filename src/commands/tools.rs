//! `tools` subcommands: list, enable and disable

use colored::Colorize;
use prettytable::{format, Table};

use super::{truncate, AppContext};
use crate::cli::ToolCommand;
use crate::error::{McpConnectError, Result};
use crate::model::Connection;
use crate::tools::ToolEnablement;

/// Handle tool commands
pub async fn handle_tools(ctx: &AppContext, command: ToolCommand) -> Result<()> {
    match command {
        ToolCommand::List { connection } => {
            let connection = ctx.connection(&connection).await?;
            print_tools(ctx, &connection).await
        }
        ToolCommand::Enable { connection, tool } => {
            let connection = ctx.connection(&connection).await?;
            set_enabled(ctx, &connection, &tool, true).await
        }
        ToolCommand::Disable { connection, tool } => {
            let connection = ctx.connection(&connection).await?;
            set_enabled(ctx, &connection, &tool, false).await
        }
    }
}

/// Print the tool table of a connection
pub async fn print_tools(ctx: &AppContext, connection: &Connection) -> Result<()> {
    let enablement = ctx.manager.enablement(&connection.id).await?;

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "Tool".bold(),
        "Source".bold(),
        "Enabled".bold(),
        "Description".bold()
    ]);

    for tool in enablement.tools() {
        let enabled = if enablement.is_enabled(&tool.id) {
            "yes".green()
        } else {
            "no".red()
        };
        let source = if tool.is_system() { "system" } else { "server" };
        table.add_row(prettytable::row![
            tool.name.cyan(),
            source,
            enabled,
            truncate(&tool.description, 60)
        ]);
    }

    println!("\nTools on {}:", connection.name.bold());
    table.printstd();
    println!(
        "{} of {} tools enabled\n",
        enablement.enabled_tools().len(),
        enablement.tools().len()
    );
    Ok(())
}

/// Enable or disable a tool given its id or name
pub async fn set_enabled(
    ctx: &AppContext,
    connection: &Connection,
    tool: &str,
    enabled: bool,
) -> Result<()> {
    let enablement = ctx.manager.enablement(&connection.id).await?;
    let tool_id = resolve_tool(&enablement, tool)?;
    ctx.manager
        .set_tool_enabled(&connection.id, &tool_id, enabled)
        .await?;

    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("{}", format!("{} {} on {}", verb, tool, connection.name).green());
    Ok(())
}

/// Resolve a tool id from an id or a name
pub fn resolve_tool(enablement: &ToolEnablement, tool: &str) -> Result<String> {
    enablement
        .tools()
        .iter()
        .find(|t| t.id == tool)
        .or_else(|| enablement.tools().iter().find(|t| t.name == tool))
        .map(|t| t.id.clone())
        .ok_or_else(|| McpConnectError::NotFound(format!("tool '{}'", tool)).into())
}
