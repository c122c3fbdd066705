//! Conversion of raw form fields into typed ticket input.
//!
//! Handlers hand over `(name, value)` pairs as they arrive from a request
//! body. Unknown names are ignored, which also keeps `id` and `createdAt`
//! out of reach of callers.

use crate::domain::ticket::{NewTicket, TicketPriority, TicketStatus, TicketUpdate};
use crate::error::Result;

impl NewTicket {
    pub fn from_form<'a, I>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let update = TicketUpdate::from_form(fields)?;
        let new = Self {
            title: update.title.unwrap_or_default(),
            description: update.description,
            status: update.status,
            priority: update.priority,
        };
        new.validate()?;
        Ok(new)
    }
}

impl TicketUpdate {
    pub fn from_form<'a, I>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut update = Self::default();
        for (name, value) in fields {
            match name {
                "title" => update.title = Some(value.to_string()),
                "description" => update.description = Some(value.to_string()),
                "status" if !value.trim().is_empty() => {
                    update.status = Some(value.parse::<TicketStatus>()?)
                }
                "priority" if !value.trim().is_empty() => {
                    update.priority = Some(value.parse::<TicketPriority>()?)
                }
                _ => {}
            }
        }
        update.validate()?;
        Ok(update)
    }
}
