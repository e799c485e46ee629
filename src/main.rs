//! mcpconnect - chat with a language model that can call MCP server tools
//!
#![doc = "Main entry point for the mcpconnect CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcpconnect::cli::{Cli, Commands};
use mcpconnect::commands::{self, AppContext};
use mcpconnect::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config_path(), &cli)?;
    init_tracing(cli.verbose, config.logging.json);
    config.validate()?;

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Chat {
            connection,
            conversation,
            new,
        } => {
            tracing::info!("Starting interactive chat on {}", connection);
            commands::chat::run_chat(&ctx, &connection, conversation, new).await
        }
        Commands::Connections { command } => {
            commands::connections::handle_connections(&ctx, command).await
        }
        Commands::Tools { command } => commands::tools::handle_tools(&ctx, command).await,
        Commands::Conversations { command } => {
            commands::conversations::handle_conversations(&ctx, command).await
        }
        Commands::Executions { command } => {
            commands::executions::handle_executions(&ctx, command).await
        }
        Commands::Share { command } => commands::share::handle_share(&ctx, command).await,
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so command output stays pipeable.
fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "mcpconnect=debug" } else { "mcpconnect=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
