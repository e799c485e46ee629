//! `connections` subcommands

use colored::Colorize;
use prettytable::{format, Table};

use super::{short_id, AppContext};
use crate::cli::ConnectionCommand;
use crate::error::{McpConnectError, Result};
use crate::model::{AuthConfig, AuthScheme, Connection};

/// Handle connection commands
pub async fn handle_connections(ctx: &AppContext, command: ConnectionCommand) -> Result<()> {
    match command {
        ConnectionCommand::List => list(ctx).await,
        ConnectionCommand::Add {
            name,
            url,
            bearer,
            api_key,
            api_key_header,
            basic,
            timeout_ms,
            retries,
            no_refresh,
        } => {
            let scheme = auth_scheme(bearer, api_key, api_key_header, basic)?;
            let mut connection = Connection::new(name, url).with_auth(AuthConfig {
                scheme,
                headers: Default::default(),
            });
            if let Some(timeout_ms) = timeout_ms {
                connection.timeout_ms = timeout_ms;
            }
            if let Some(retries) = retries {
                connection.retry_count = retries;
            }

            let connection = ctx.manager.add(connection).await?;
            println!(
                "{}",
                format!("Added connection {} ({})", connection.name, short_id(&connection.id))
                    .green()
            );
            if !no_refresh {
                refresh(ctx, &connection).await;
            }
            Ok(())
        }
        ConnectionCommand::Remove { connection } => {
            let connection = ctx.connection(&connection).await?;
            ctx.manager.remove(&connection.id).await?;
            println!(
                "{}",
                format!("Removed connection {} and its history", connection.name).green()
            );
            Ok(())
        }
        ConnectionCommand::RefreshTools { connection } => {
            let connection = ctx.connection(&connection).await?;
            let tools = ctx
                .manager
                .refresh_tools(&connection.id, ctx.mcp.as_ref())
                .await?;
            println!(
                "{}",
                format!("Fetched {} tools from {}", tools.len(), connection.name).green()
            );
            Ok(())
        }
    }
}

async fn list(ctx: &AppContext) -> Result<()> {
    let connections = ctx.manager.list().await?;
    if connections.is_empty() {
        println!("{}", "No connections configured.".yellow());
        println!(
            "Use {} to add one.",
            "mcpconnect connections add <NAME> <URL>".cyan()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "URL".bold(),
        "Auth".bold(),
        "Tools".bold(),
        "Status".bold()
    ]);

    for connection in &connections {
        let tools = ctx.manager.tools(&connection.id).await?.len();
        let status = if connection.is_connected {
            "connected".green()
        } else {
            "disconnected".yellow()
        };
        table.add_row(prettytable::row![
            short_id(&connection.id).cyan(),
            connection.name,
            connection.url,
            connection.auth.scheme.kind(),
            tools,
            status
        ]);
    }

    println!("\nConnections:");
    table.printstd();
    println!();
    Ok(())
}

/// Fetch the tool catalog, reporting failures without aborting
async fn refresh(ctx: &AppContext, connection: &Connection) {
    match ctx
        .manager
        .refresh_tools(&connection.id, ctx.mcp.as_ref())
        .await
    {
        Ok(tools) => println!("Fetched {} tools", tools.len()),
        Err(e) => eprintln!(
            "{}",
            format!(
                "Could not fetch tools from {}: {}. Run `mcpconnect connections refresh-tools {}` later.",
                connection.name, e, connection.name
            )
            .yellow()
        ),
    }
}

fn auth_scheme(
    bearer: Option<String>,
    api_key: Option<String>,
    api_key_header: String,
    basic: Option<String>,
) -> Result<AuthScheme> {
    if let Some(token) = bearer {
        return Ok(AuthScheme::Bearer { token });
    }
    if let Some(key) = api_key {
        return Ok(AuthScheme::ApiKey {
            header_name: api_key_header,
            key,
        });
    }
    if let Some(credentials) = basic {
        let (username, password) = credentials.split_once(':').ok_or_else(|| {
            McpConnectError::Config("--basic expects 'user:password'".to_string())
        })?;
        return Ok(AuthScheme::Basic {
            username: username.to_string(),
            password: password.to_string(),
        });
    }
    Ok(AuthScheme::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_scheme_selection() {
        assert_eq!(
            auth_scheme(None, None, "X-API-Key".to_string(), None).unwrap(),
            AuthScheme::None
        );
        assert_eq!(
            auth_scheme(None, Some("k".to_string()), "X-Key".to_string(), None).unwrap(),
            AuthScheme::ApiKey {
                header_name: "X-Key".to_string(),
                key: "k".to_string()
            }
        );
        assert_eq!(
            auth_scheme(None, None, "X-API-Key".to_string(), Some("u:p:w".to_string())).unwrap(),
            AuthScheme::Basic {
                username: "u".to_string(),
                password: "p:w".to_string()
            }
        );
        assert!(auth_scheme(None, None, "X-API-Key".to_string(), Some("nocolon".to_string())).is_err());
    }
}
