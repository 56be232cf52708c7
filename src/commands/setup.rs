use tracing::info;

use super::require_staff;
use crate::messages::{setup_panel_buttons, setup_panel_embed};
use crate::{Context, Error};

/// Setup the testing system
///
/// Posts the panel applicants use to open a testing ticket.
#[poise::command(slash_command, guild_only, check = "require_staff")]
pub async fn setup(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .embed(setup_panel_embed())
            .components(setup_panel_buttons()),
    )
    .await?;

    info!(
        "Testing panel posted in channel {} by {}",
        ctx.channel_id(),
        ctx.author().name
    );
    Ok(())
}
