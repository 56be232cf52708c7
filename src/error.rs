use thiserror::Error;

use crate::models::CooldownRemaining;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Ticket errors
    #[error("You must wait {remaining} before creating another ticket.")]
    RateLimited { remaining: CooldownRemaining },

    #[error("This command can only be used in ticket channels!")]
    NotATicket,

    // Lookup errors
    #[error("Could not find the tested user ({user_id})!")]
    UserNotFound { user_id: String },

    #[error("Could not find Minecraft player: {username}")]
    ProfileNotFound { username: String },

    #[error("Profile lookup failed: {message}")]
    UpstreamFailure { message: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Channel not found: {name}")]
    ChannelNotFound { name: String },

    #[error("Role not found: {name}")]
    RoleNotFound { name: String },

    // Permission errors
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::UpstreamFailure {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Discord rejects a second response to the same interaction with code 40060.
pub fn is_already_acknowledged(err: &serenity::Error) -> bool {
    let err_str = err.to_string();
    err_str.contains("40060") || err_str.contains("already been acknowledged")
}

use poise::serenity_prelude as serenity;
