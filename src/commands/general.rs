use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(poise::CreateReply::default()
        .content("Pong! Bot is working!")
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Command overview for players and testers
pub fn help_embed() -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Tier Testing")
        .description(
            "Apply from the testing panel to open a private ticket with the testers. \
             Once your test is done, a tester posts your results and your tier role is updated. \
             You can open one ticket per cooldown period.",
        )
        .field("/cooldown", "Check when you can open your next ticket", false)
        .field("/ping", "Check if the bot is running", false)
        .field("/setup", "Post the tier testing panel (Staff)", false)
        .field("/results", "Record a player's results and close their ticket (Staff)", false)
        .color(0x3498db)
}

/// Show how tier testing works
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().embed(help_embed()).ephemeral(true)).await?;
    Ok(())
}
