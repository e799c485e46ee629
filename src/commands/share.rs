//! `share` subcommands

use colored::Colorize;

use super::{short_id, AppContext};
use crate::cli::ShareCommand;
use crate::error::Result;
use crate::model::{Connection, Conversation};
use crate::share;

/// Handle share commands
pub async fn handle_share(ctx: &AppContext, command: ShareCommand) -> Result<()> {
    match command {
        ShareCommand::Export { connection, id } => {
            let connection = ctx.connection(&connection).await?;
            let conversation = ctx.conversation(&connection, &id).await?;
            let url = export_url(ctx, &connection, &conversation).await?;
            println!("{}", url);
            Ok(())
        }
        ShareCommand::Import { link } => {
            let imported = share::decode(&link)?.import();
            let conversation = imported.save(&ctx.manager).await?;
            println!(
                "{}",
                format!(
                    "Imported \"{}\" as connection {} ({})",
                    conversation.title,
                    imported.connection.name,
                    short_id(&imported.connection.id)
                )
                .green()
            );
            println!("Share links carry no credentials; re-add the connection with auth if the server needs it.");
            Ok(())
        }
    }
}

/// Build a share URL for a conversation
pub async fn export_url(
    ctx: &AppContext,
    connection: &Connection,
    conversation: &Conversation,
) -> Result<String> {
    let encoded = share::export(
        &ctx.manager,
        connection,
        conversation,
        ctx.config.share.max_encoded_bytes,
    )
    .await?;
    share::share_url(&ctx.config.share.base_url, &encoded)
}
