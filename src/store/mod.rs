pub mod session_store;
pub mod ticket_store;

pub use session_store::{AccountRepository, SessionStore, SESSION_KEY, USERS_KEY};
pub use ticket_store::{TicketRepository, TicketStore, TICKETS_KEY};
