use poise::serenity_prelude::{ChannelId, RoleId};
use std::time::Duration;

use crate::error::{BotError, Result};
use crate::models::TestType;

const DEFAULT_PROFILE_API_URL: &str = "https://api.mojang.com/users/profiles/minecraft";

/// Runtime configuration, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,

    /// Category new evaluation tickets are created under
    pub eval_category_id: ChannelId,

    /// Category new HT3+ tickets are created under
    pub ht3_category_id: ChannelId,

    /// Role that can see every ticket
    pub staff_role_id: RoleId,

    /// Role required for /setup and /results
    pub command_role_id: RoleId,

    pub results_channel_id: ChannelId,

    /// Port for the health-check responder
    pub health_port: u16,

    pub data_path: String,
    pub state_path: String,

    pub ticket_cooldown: chrono::Duration,
    pub close_delay: Duration,

    pub profile_api_url: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// Blank values count as unset, so a copied `.env.example` falls back to defaults.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = lookup("DISCORD_TOKEN").ok_or_else(|| BotError::ConfigValidation {
            message: "Missing DISCORD_TOKEN environment variable".to_string(),
        })?;

        let staff_role_id = RoleId::new(required_id(&lookup, "STAFF_ROLE_ID")?);
        let command_role_id = match lookup("COMMAND_ROLE_ID") {
            Some(_) => RoleId::new(required_id(&lookup, "COMMAND_ROLE_ID")?),
            None => staff_role_id,
        };

        let cooldown_hours: i64 = parsed_or(&lookup, "TICKET_COOLDOWN_HOURS", 24)?;
        let ticket_cooldown = chrono::Duration::try_hours(cooldown_hours)
            .filter(|_| cooldown_hours > 0)
            .ok_or_else(|| BotError::ConfigValidation {
                message: format!(
                    "TICKET_COOLDOWN_HOURS must be a positive number of hours, got {}",
                    cooldown_hours
                ),
            })?;
        let close_delay_secs: u64 = parsed_or(&lookup, "TICKET_CLOSE_DELAY_SECS", 10)?;

        Ok(Self {
            discord_token,
            eval_category_id: ChannelId::new(required_id(&lookup, "EVAL_CATEGORY_ID")?),
            ht3_category_id: ChannelId::new(required_id(&lookup, "HT3_CATEGORY_ID")?),
            staff_role_id,
            command_role_id,
            results_channel_id: ChannelId::new(required_id(&lookup, "RESULTS_CHANNEL_ID")?),
            health_port: parsed_or(&lookup, "PORT", 8080)?,
            data_path: lookup("DATA_PATH").unwrap_or_else(|| "data".to_string()),
            state_path: lookup("STATE_PATH").unwrap_or_else(|| "state".to_string()),
            ticket_cooldown,
            close_delay: Duration::from_secs(close_delay_secs),
            profile_api_url: lookup("PROFILE_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PROFILE_API_URL.to_string()),
        })
    }

    pub fn category_for(&self, test_type: TestType) -> ChannelId {
        match test_type {
            TestType::Evaluation => self.eval_category_id,
            TestType::Ht3Plus => self.ht3_category_id,
        }
    }

    pub fn tier_roles_path(&self) -> String {
        format!("{}/tier_roles.json", self.data_path)
    }

    pub fn ticket_state_path(&self) -> String {
        format!("{}/tickets.json", self.state_path)
    }
}

/// Discord snowflakes are never zero, serenity panics on `Id::new(0)`
fn required_id<F>(lookup: &F, key: &str) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or_else(|| BotError::ConfigValidation {
        message: format!("Missing {} environment variable", key),
    })?;

    match raw.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(BotError::ConfigValidation {
            message: format!("{} must be a non-zero Discord ID, got '{}'", key, raw),
        }),
    }
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| BotError::ConfigValidation {
            message: format!("{} has an invalid value '{}'", key, raw),
        }),
        None => Ok(default),
    }
}
