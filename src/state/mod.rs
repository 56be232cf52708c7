pub mod ticket_state;

pub use ticket_state::{
    create_shared_ticket_state, ticket_channel_name, SharedTicketState, TicketRecord,
    TicketState, TicketStatus,
};
