use crate::error::{Result, TicketAppError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Opaque unique identifier for a ticket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Wraps an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh collision-resistant identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TicketId {
    type Err = TicketAppError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TicketAppError::validation("id", "ticket id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow status of a ticket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [Self::Open, Self::InProgress, Self::Closed];

    /// Wire name used in forms and persisted documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = TicketAppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            other => Err(TicketAppError::validation(
                "status",
                format!("'{}' is not one of open, in_progress, closed", other),
            )),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = TicketAppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TicketAppError::validation(
                "priority",
                format!("'{}' is not one of low, medium, high", other),
            )),
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// A stored ticket. Keys are camelCase (`createdAt`) on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Builds a ticket from validated input, assigning a fresh id and timestamp
    pub(crate) fn from_new(new: NewTicket) -> Self {
        Self {
            id: TicketId::generate(),
            title: new.title,
            description: new.description.unwrap_or_default(),
            status: new.status.unwrap_or_default(),
            priority: new.priority.unwrap_or_default(),
            created_at: Utc::now(),
        }
    }

    /// Merges the provided fields; `id` and `created_at` are never touched
    pub fn apply(&mut self, update: TicketUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
    }

    /// The three tickets a fresh installation starts with
    pub fn samples() -> Vec<Ticket> {
        let now = Utc::now();
        let sample = |id: &str, title: &str, description: &str, status, priority| Ticket {
            id: TicketId::new(id),
            title: title.to_string(),
            description: description.to_string(),
            status,
            priority,
            created_at: now,
        };

        vec![
            sample(
                "1",
                "Fix login bug",
                "Users cannot login with correct credentials",
                TicketStatus::Open,
                TicketPriority::High,
            ),
            sample(
                "2",
                "Update documentation",
                "Add API documentation for new endpoints",
                TicketStatus::InProgress,
                TicketPriority::Medium,
            ),
            sample(
                "3",
                "Improve UI design",
                "Modernize the dashboard layout",
                TicketStatus::Closed,
                TicketPriority::Low,
            ),
        ]
    }
}

/// Input for creating a ticket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

impl NewTicket {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }
}

/// Partial update; `None` leaves the stored value unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

impl TicketUpdate {
    pub fn status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TicketAppError::validation("title", "title is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = TicketId::generate();
        let b = TicketId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_ticket_id_parsing() {
        let id = TicketId::from_str(" 1700000000 ").unwrap();
        assert_eq!(id.as_str(), "1700000000");
        assert!(TicketId::from_str("   ").is_err());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(TicketStatus::from_str("open").unwrap(), TicketStatus::Open);
        assert_eq!(
            TicketStatus::from_str("in_progress").unwrap(),
            TicketStatus::InProgress
        );
        assert_eq!(TicketStatus::from_str("closed").unwrap(), TicketStatus::Closed);

        let err = TicketStatus::from_str("done").unwrap_err();
        assert!(matches!(
            err,
            TicketAppError::Validation { field: "status", .. }
        ));
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!(TicketPriority::from_str("high").unwrap(), TicketPriority::High);
        assert!(TicketPriority::from_str("urgent").is_err());
    }

    #[test]
    fn test_new_ticket_defaults() {
        let ticket = Ticket::from_new(NewTicket::new("Write tests"));
        assert_eq!(ticket.title, "Write tests");
        assert_eq!(ticket.description, "");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Medium);
    }

    #[test]
    fn test_new_ticket_requires_title() {
        assert!(NewTicket::new("").validate().is_err());
        assert!(NewTicket::new("  \t").validate().is_err());
        assert!(NewTicket::new("ok").validate().is_ok());
    }

    #[test]
    fn test_apply_merges_only_provided_fields() {
        let mut ticket = Ticket::from_new(
            NewTicket::new("Original")
                .with_description("keep me")
                .with_priority(TicketPriority::High),
        );
        let id = ticket.id.clone();
        let created_at = ticket.created_at;

        ticket.apply(TicketUpdate::status(TicketStatus::Closed));

        assert_eq!(ticket.status, TicketStatus::Closed);
        assert_eq!(ticket.title, "Original");
        assert_eq!(ticket.description, "keep me");
        assert_eq!(ticket.priority, TicketPriority::High);
        assert_eq!(ticket.id, id);
        assert_eq!(ticket.created_at, created_at);
    }

    #[test]
    fn test_update_rejects_blank_title() {
        assert!(TicketUpdate::default().with_title(" ").validate().is_err());
        assert!(TicketUpdate::default().validate().is_ok());
        assert!(TicketUpdate::default().is_empty());
    }

    #[test]
    fn test_samples_cover_each_status() {
        let samples = Ticket::samples();
        assert_eq!(samples.len(), 3);
        for status in TicketStatus::ALL {
            assert_eq!(samples.iter().filter(|t| t.status == status).count(), 1);
        }
    }

    #[test]
    fn test_serialization_uses_wire_names() {
        let ticket = Ticket::samples().remove(1);
        let json = serde_json::to_value(&ticket).unwrap();

        assert_eq!(json["id"], "2");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["priority"], "medium");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_deserializes_documents_with_offsets_and_missing_fields() {
        let doc = r#"{
        "id": "1700000000",
        "title": "From disk",
        "status": "closed",
        "createdAt": "2024-01-01T10:00:00+02:00"
    }"#;

        let ticket: Ticket = serde_json::from_str(doc).unwrap();
        assert_eq!(ticket.id.as_str(), "1700000000");
        assert_eq!(ticket.description, "");
        assert_eq!(ticket.priority, TicketPriority::Medium);
        assert_eq!(ticket.created_at.to_rfc3339(), "2024-01-01T08:00:00+00:00");
    }
}
