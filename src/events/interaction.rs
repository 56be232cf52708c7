use chrono::Utc;
use poise::serenity_prelude::{
    self as serenity, ActionRowComponent, ChannelId, ComponentInteraction, CreateInteractionResponse,
    CreateInteractionResponseFollowup, Mentionable, ModalInteraction,
};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::error::{is_already_acknowledged, BotError, Result as BotResult};
use crate::messages::{
    application_embed, application_form, cooldown_message, ticket_created_message,
    FORM_MODAL_PREFIX, PANEL_BUTTON_PREFIX,
};
use crate::models::{TestType, TestingApplication};
use crate::{Data, Error};

/// Route panel buttons and application form submissions
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    match interaction {
        serenity::Interaction::Component(component) => handle_panel_button(ctx, component).await,
        serenity::Interaction::Modal(modal) => handle_application_submit(ctx, modal, data).await,
        _ => Ok(()),
    }
}

/// Parse the test type out of a custom id such as `tier_testing:ht3plus`
pub fn test_type_from_custom_id(custom_id: &str, prefix: &str) -> Option<TestType> {
    custom_id.strip_prefix(prefix).and_then(TestType::from_id)
}

/// Open the application form for the button that was pressed
async fn handle_panel_button(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    let Some(test_type) = test_type_from_custom_id(&component.data.custom_id, PANEL_BUTTON_PREFIX)
    else {
        return Ok(());
    };

    debug!(
        "{} opened the {} form",
        component.user.name,
        test_type.display_name()
    );

    let response = CreateInteractionResponse::Modal(application_form(test_type));
    match component.create_response(&ctx.http, response).await {
        Ok(()) => Ok(()),
        Err(e) if is_already_acknowledged(&e) => {
            debug!("Panel button from {} was already acknowledged", component.user.name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Input values of a submitted modal keyed by input id
fn modal_fields(modal: &ModalInteraction) -> HashMap<String, String> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => Some((
                input.custom_id.clone(),
                input.value.clone().unwrap_or_default(),
            )),
            _ => None,
        })
        .collect()
}

async fn handle_application_submit(
    ctx: &serenity::Context,
    modal: &ModalInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(test_type) = test_type_from_custom_id(&modal.data.custom_id, FORM_MODAL_PREFIX)
    else {
        return Ok(());
    };

    if let Err(e) = modal.defer_ephemeral(&ctx.http).await {
        if !is_already_acknowledged(&e) {
            return Err(e.into());
        }
        debug!("Application from {} was already acknowledged", modal.user.name);
    }

    let content = match open_ticket(ctx, modal, data, test_type).await {
        Ok(channel_id) => ticket_created_message(&channel_id.mention().to_string()),
        Err(BotError::RateLimited { remaining }) => cooldown_message(remaining),
        Err(e @ (BotError::ChannelNotFound { .. } | BotError::RoleNotFound { .. })) => {
            error!("Ticket setup is misconfigured: {}", e);
            "Error: Category or Staff role not found! Please contact an administrator."
                .to_string()
        }
        Err(e) => {
            warn!("Failed to open ticket for {}: {}", modal.user.name, e);
            format!("An error occurred: {}", e)
        }
    };

    modal
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

/// Create-ticket flow: reserve, create the channel, then commit the cooldown
async fn open_ticket(
    ctx: &serenity::Context,
    modal: &ModalInteraction,
    data: &Data,
    test_type: TestType,
) -> BotResult<ChannelId> {
    let guild_id = modal.guild_id.ok_or_else(|| BotError::Internal {
        message: "Applications can only be submitted in a server".to_string(),
    })?;
    let application = TestingApplication::from_fields(test_type, &modal_fields(modal))?;
    let applicant_id = modal.user.id;

    let reservation = data
        .ticket_tracker
        .request_ticket(applicant_id, Utc::now())
        .await?;

    // An error here drops the reservation, so no cooldown is consumed
    let channel = data
        .channel_manager
        .create_ticket_channel(&ctx.http, guild_id, applicant_id, &application)
        .await?;

    reservation
        .commit(
            channel.id,
            &application.minecraft_username,
            test_type,
            Utc::now(),
        )
        .await;

    let embed = application_embed(&application, &applicant_id.mention().to_string());
    if let Err(e) = channel
        .id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .content(format!(
                    "{} New tier testing ticket!",
                    data.config.staff_role_id.mention()
                ))
                .embed(embed),
        )
        .await
    {
        warn!("Failed to post application in {}: {}", channel.id, e);
    }

    info!(
        "{} opened a {} ticket in {}",
        modal.user.name,
        test_type.display_name(),
        channel.id
    );
    Ok(channel.id)
}
