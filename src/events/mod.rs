pub mod channel;
pub mod interaction;

pub use channel::handle_channel_delete;
pub use interaction::handle_interaction;
