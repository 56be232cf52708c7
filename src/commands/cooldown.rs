use tracing::debug;

use crate::messages::{cooldown_message, NO_COOLDOWN};
use crate::{Context, Error};

/// Check your remaining ticket cooldown
#[poise::command(slash_command)]
pub async fn cooldown(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id;
    let remaining = ctx
        .data()
        .ticket_tracker
        .check_cooldown(user_id, chrono::Utc::now())
        .await;

    debug!("Cooldown for {}: {:?}", user_id, remaining);

    let content = match remaining {
        Some(remaining) => cooldown_message(remaining),
        None => NO_COOLDOWN.to_string(),
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}
