//! Health-check HTTP responder
//!
//! Runs alongside the Discord bot so hosting platforms can probe liveness.
//! It shares no state with the bot.

mod health;

pub use health::start_health_server;
