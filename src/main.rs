use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot for tier testing tickets, results and rank roles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;
mod config;
mod error;
mod events;
mod logging;
mod managers;
mod messages;
mod models;
mod state;
mod web;

use commands::{cooldown, help, ping, results, setup};
use config::{BotConfig, TierRolesConfig};
use error::BotError;
use events::{handle_channel_delete, handle_interaction};
use managers::{
    create_shared_channel_manager, create_shared_profile_lookup, create_shared_role_manager,
    create_shared_ticket_tracker, run_startup_permission_check, SharedChannelManager,
    SharedProfileLookup, SharedRoleManager, SharedTicketTracker,
};
use state::{create_shared_ticket_state, TicketState};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub ticket_tracker: SharedTicketTracker,
    pub role_manager: SharedRoleManager,
    pub channel_manager: SharedChannelManager,
    pub profile_lookup: SharedProfileLookup,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Err(e) = handle_interaction(ctx, interaction, data).await {
                error!("Failed to handle interaction: {}", e);
            }
        }
        serenity::FullEvent::ChannelDelete { channel, .. } => {
            handle_channel_delete(&data.ticket_tracker, channel.id).await;
        }
        serenity::FullEvent::Resume { .. } => {
            info!("Bot reconnected!");
        }
        _ => {}
    }
    Ok(())
}

/// Log the application ID encoded in the first segment of the token
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };

    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));

    if let Ok(Ok(id_str)) = decoded.map(String::from_utf8) {
        info!("Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)", id_str, id_str);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init();

    let config = Arc::new(BotConfig::from_env()?);
    log_bot_id(&config.discord_token);

    // Health responder is independent of the bot and starts first
    let health_port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = web::start_health_server(health_port).await {
            error!("Health check server error: {}", e);
        }
    });

    info!("Loading tier roles from {}...", config.tier_roles_path());
    let tier_roles = match TierRolesConfig::load_from_file(&config.tier_roles_path()) {
        Ok(roles) => roles,
        Err(e @ BotError::ConfigLoad { .. }) => {
            warn!("Could not load tier roles: {}, rank roles will not be assigned", e);
            TierRolesConfig::default()
        }
        Err(e) => return Err(e.into()),
    };
    if tier_roles.is_empty() {
        warn!("No tier roles configured");
    } else {
        info!("Loaded {} tier role(s)", tier_roles.len());
    }
    let missing = tier_roles.missing_ranks();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|r| r.as_str()).collect();
        warn!("No role configured for: {}", names.join(", "));
    }

    // Ensure state directory exists
    tokio::fs::create_dir_all(&config.state_path).await.ok();

    info!("Loading ticket state...");
    let state_path = config.ticket_state_path();
    let ticket_state = TicketState::load(&state_path).await.unwrap_or_else(|e| {
        warn!("Could not load ticket state: {}, using empty state", e);
        TicketState::new()
    });
    let ticket_tracker = create_shared_ticket_tracker(
        create_shared_ticket_state(ticket_state),
        &state_path,
        config.ticket_cooldown,
    );
    ticket_tracker.purge_expired(chrono::Utc::now()).await;
    info!("{} ticket(s) open", ticket_tracker.open_ticket_count().await);

    let role_manager = create_shared_role_manager(tier_roles);
    let channel_manager = create_shared_channel_manager(config.clone());
    let profile_lookup = create_shared_profile_lookup(&config.profile_api_url);

    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help(), cooldown(), setup(), results()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content(format!("An error occurred: {}", error))
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
                            if let Some(error) = error {
                                error!("Check for '{}' failed: {}", ctx.command().qualified_name, error);
                            }
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = config.clone();
            let ticket_tracker = ticket_tracker.clone();
            let role_manager = role_manager.clone();
            let channel_manager = channel_manager.clone();
            let profile_lookup = profile_lookup.clone();

            Box::pin(async move {
                info!("Bot is ready! Logged in as {}", ready.user.name);

                let guild_ids: Vec<serenity::GuildId> = ready.guilds.iter().map(|g| g.id).collect();
                if guild_ids.is_empty() {
                    warn!("Bot is not in any guilds - skipping permission check");
                } else {
                    run_startup_permission_check(
                        ctx.http.as_ref(),
                        &guild_ids,
                        role_manager.tier_roles(),
                    )
                    .await;
                }

                let guilds_to_register: Vec<serenity::GuildId> = match target_guild_id {
                    Some(gid) => vec![serenity::GuildId::new(gid)],
                    None => guild_ids,
                };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                Ok(Data {
                    config,
                    ticket_tracker,
                    role_manager,
                    channel_manager,
                    profile_lookup,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable MESSAGE_CONTENT and GUILD_MEMBERS in the Discord Developer Portal:");
            error!("Go to https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable MESSAGE_CONTENT and GUILD_MEMBERS in the Discord Developer Portal"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
