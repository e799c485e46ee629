//! `executions` subcommand: the tool execution log of a connection

use colored::Colorize;
use prettytable::{format, Table};

use super::{short_id, truncate, AppContext};
use crate::cli::ExecutionCommand;
use crate::error::Result;
use crate::model::ExecutionStatus;

/// Handle execution log commands
pub async fn handle_executions(ctx: &AppContext, command: ExecutionCommand) -> Result<()> {
    match command {
        ExecutionCommand::List { connection, json } => {
            let connection = ctx.connection(&connection).await?;
            let executions = ctx.manager.executions().list(&connection.id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&executions)?);
                return Ok(());
            }
            if executions.is_empty() {
                println!("{}", "No tool executions recorded.".yellow());
                return Ok(());
            }

            let enablement = ctx.manager.enablement(&connection.id).await?;
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Tool".bold(),
                "Status".bold(),
                "Duration".bold(),
                "When".bold(),
                "Detail".bold()
            ]);

            for execution in &executions {
                let label = enablement.status_label(execution);
                let status = match execution.status {
                    ExecutionStatus::Success => label.green(),
                    ExecutionStatus::Error => label.red(),
                    ExecutionStatus::Pending => label.yellow(),
                };
                let detail = match (&execution.error, &execution.response) {
                    (Some(error), _) => truncate(error, 50),
                    (None, Some(response)) => truncate(&response.result.format_for_provider(), 50),
                    (None, None) => String::new(),
                };
                table.add_row(prettytable::row![
                    short_id(&execution.id).cyan(),
                    execution.tool,
                    status,
                    format!("{} ms", execution.duration_ms),
                    execution.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    detail.replace('\n', " ")
                ]);
            }

            println!("\nTool executions on {}:", connection.name.bold());
            table.printstd();
            println!();
            Ok(())
        }
    }
}
