pub mod cooldown;
pub mod general;
pub mod results;
pub mod setup;

pub use cooldown::cooldown;
pub use general::{help, ping};
pub use results::results;
pub use setup::setup;

use tracing::warn;

use crate::messages::PERMISSION_DENIED;
use crate::{Context, Error};

/// Command check: the invoking member must hold the configured command role
pub async fn require_staff(ctx: Context<'_>) -> Result<bool, Error> {
    let required = ctx.data().config.command_role_id;
    let allowed = match ctx.author_member().await {
        Some(member) => member.roles.contains(&required),
        None => false,
    };

    if !allowed {
        warn!(
            "{} (ID: {}) tried to use '{}' without the command role",
            ctx.author().name,
            ctx.author().id,
            ctx.command().qualified_name
        );
        ctx.send(
            poise::CreateReply::default()
                .content(PERMISSION_DENIED)
                .ephemeral(true),
        )
        .await?;
    }

    Ok(allowed)
}
