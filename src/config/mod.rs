pub mod bot_config;
pub mod tier_roles;

pub use bot_config::BotConfig;
pub use tier_roles::TierRolesConfig;
