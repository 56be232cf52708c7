pub mod channel_manager;
pub mod permission_checker;
pub mod profile_lookup;
pub mod role_manager;
pub mod ticket_manager;

pub use channel_manager::{create_shared_channel_manager, ChannelManager, SharedChannelManager};
pub use permission_checker::run_startup_permission_check;
pub use profile_lookup::{create_shared_profile_lookup, SharedProfileLookup};
pub use role_manager::{create_shared_role_manager, SharedRoleManager};
pub use ticket_manager::{create_shared_ticket_tracker, SharedTicketTracker};
