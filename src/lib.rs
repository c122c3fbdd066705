//! # TicketApp Core
//!
//! Ticket and session stores for the TicketApp ticket tracker.
//!
//! Every front end (server-rendered pages, single-page apps, CLIs) shares
//! the same [`TicketRepository`] and [`AccountRepository`] implementations,
//! selected at startup through [`AppContext`] over a pluggable
//! [`Storage`] backend.

pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod routes;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use app::AppContext;
pub use config::AppConfig;
pub use domain::{
    NewTicket, Ticket, TicketId, TicketPriority, TicketStats, TicketStatus, TicketUpdate,
};
pub use error::{ErrorKind, Result, TicketAppError};
pub use routes::{Access, Method, Route};
pub use storage::Storage;
pub use store::{AccountRepository, SessionStore, TicketRepository, TicketStore};
