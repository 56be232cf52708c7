use poise::serenity_prelude::{self as serenity, Mentionable, UserId};
use tracing::{error, info, warn};

use super::require_staff;
use crate::error::{BotError, Result as BotResult};
use crate::managers::ChannelManager;
use crate::messages::{closing_message, result_reactions, results_embed, ResultsSummary, RESULTS_SUBMITTED};
use crate::models::{Region, TierRank};
use crate::{Context, Error};

/// Submit test results and close ticket
#[poise::command(slash_command, guild_only, check = "require_staff")]
pub async fn results(
    ctx: Context<'_>,
    #[description = "Minecraft username of the player"] mc_username: String,
    #[description = "Player's region"] region: Region,
    #[description = "Previous rank of the player"] previous_rank: TierRank,
    #[description = "New rank earned by the player"] new_rank: TierRank,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    info!(
        "Processing results in channel {}: {} {} -> {}",
        ctx.channel_id(),
        mc_username,
        previous_rank,
        new_rank
    );

    if let Err(e) = submit_results(ctx, mc_username.trim(), region, previous_rank, new_rank).await {
        warn!("Results in channel {} not recorded: {}", ctx.channel_id(), e);
        ctx.send(
            poise::CreateReply::default()
                .content(e.to_string())
                .ephemeral(true),
        )
        .await?;
    }

    Ok(())
}

async fn submit_results(
    ctx: Context<'_>,
    mc_username: &str,
    region: Region,
    previous_rank: TierRank,
    new_rank: TierRank,
) -> BotResult<()> {
    let data = ctx.data();
    let http = ctx.http();
    let guild_id = ctx.guild_id().ok_or(BotError::NotATicket)?;
    let channel_id = ctx.channel_id();

    let ticket = data
        .ticket_tracker
        .open_ticket_for_channel(channel_id)
        .await
        .ok_or(BotError::NotATicket)?;

    let player_id = ticket
        .requester_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
        .ok_or_else(|| BotError::UserNotFound {
            user_id: ticket.requester_id.clone(),
        })?;

    let player = guild_id
        .member(http, player_id)
        .await
        .map_err(|_| BotError::UserNotFound {
            user_id: ticket.requester_id.clone(),
        })?;

    let profile = data.profile_lookup.lookup(mc_username).await?;
    info!(
        "Tested player {} is {} ({})",
        player.user.name, mc_username, profile.id
    );

    let summary = ResultsSummary {
        player_name: player.display_name(),
        player_avatar_url: player.face(),
        player_mention: player.mention().to_string(),
        tester_mention: ctx.author().mention().to_string(),
        region,
        minecraft_username: mc_username,
        previous_rank,
        new_rank,
    };

    let message = data
        .config
        .results_channel_id
        .send_message(
            http,
            serenity::CreateMessage::new()
                .content(player.mention().to_string())
                .embed(results_embed(&summary)),
        )
        .await
        .map_err(|e| BotError::Discord {
            message: format!("Error sending results: {}", e),
        })?;

    for reaction in result_reactions() {
        message.react(http, reaction).await.map_err(|e| BotError::Discord {
            message: format!("Error sending results: {}", e),
        })?;
    }

    // Role problems are reported in the ticket but never stop the close
    match data
        .role_manager
        .reassign_tier(http, guild_id, player_id, new_rank)
        .await
    {
        Ok(warnings) => {
            for warning in warnings {
                if let Err(e) = channel_id.say(http, format!("Warning: {}", warning)).await {
                    error!("Failed to post role warning: {}", e);
                }
            }
        }
        Err(e) => {
            if let Err(e) = channel_id
                .say(http, format!("Warning: Could not update roles: {}", e))
                .await
            {
                error!("Failed to post role warning: {}", e);
            }
        }
    }

    data.ticket_tracker.mark_results_recorded(channel_id).await?;

    // Once results are recorded the close is always scheduled
    if let Err(e) = ctx
        .send(
            poise::CreateReply::default()
                .content(RESULTS_SUBMITTED)
                .ephemeral(true),
        )
        .await
    {
        warn!("Failed to confirm results to {}: {}", ctx.author().name, e);
    }

    let delay = data.config.close_delay;
    if let Err(e) = channel_id.say(http, closing_message(delay.as_secs())).await {
        error!("Failed to post closing notice in {}: {}", channel_id, e);
    }

    let close_http = ctx.serenity_context().http.clone();
    ChannelManager::schedule_close(
        data.ticket_tracker.clone(),
        channel_id,
        delay,
        move |channel_id| async move {
            ChannelManager::delete_ticket_channel(&close_http, channel_id).await
        },
    );

    Ok(())
}
