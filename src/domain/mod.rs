pub mod account;
pub mod form;
pub mod stats;
pub mod ticket;

pub use account::{normalize_email, Account, CurrentUser, SessionRecord};
pub use stats::TicketStats;
pub use ticket::{NewTicket, Ticket, TicketId, TicketPriority, TicketStatus, TicketUpdate};
