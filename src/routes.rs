//! The page/route surface the stores serve, and which of it is gated.

use crate::domain::TicketId;

/// Where unauthenticated visitors to gated routes are sent
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn parse(method: &str) -> Option<Self> {
        if method.eq_ignore_ascii_case("GET") {
            Some(Self::Get)
        } else if method.eq_ignore_ascii_case("POST") {
            Some(Self::Post)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Signup,
    Dashboard,
    Tickets,
    CreateTicket,
    UpdateTicket(TicketId),
    DeleteTicket(TicketId),
}

/// Outcome of checking a route against the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirect(&'static str),
}

impl Route {
    /// Maps a request line onto a route; unknown paths yield `None`
    pub fn resolve(method: Method, path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match (method, segments.as_slice()) {
            (Method::Get, []) => Some(Self::Landing),
            (_, ["login"]) => Some(Self::Login),
            (_, ["signup"]) => Some(Self::Signup),
            (Method::Get, ["dashboard"]) => Some(Self::Dashboard),
            (Method::Get, ["tickets"]) => Some(Self::Tickets),
            (Method::Post, ["tickets"]) => Some(Self::CreateTicket),
            (Method::Post, ["tickets", id]) => Some(Self::UpdateTicket(TicketId::new(*id))),
            (Method::Post, ["tickets", id, "delete"]) => {
                Some(Self::DeleteTicket(TicketId::new(*id)))
            }
            _ => None,
        }
    }

    /// Dashboard and ticket routes need a signed-in user
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Landing | Self::Login | Self::Signup)
    }
}
