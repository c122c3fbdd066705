use crate::domain::ticket::{Ticket, TicketStatus};
use serde::{Deserialize, Serialize};

/// Dashboard counts over the ticket collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
}

impl TicketStats {
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        tickets.iter().fold(Self::default(), |mut stats, ticket| {
            stats.total += 1;
            match ticket.status {
                TicketStatus::Open => stats.open += 1,
                TicketStatus::InProgress => stats.in_progress += 1,
                TicketStatus::Closed => stats.closed += 1,
            }
            stats
        })
    }

    pub fn count(&self, status: TicketStatus) -> usize {
        match status {
            TicketStatus::Open => self.open,
            TicketStatus::InProgress => self.in_progress,
            TicketStatus::Closed => self.closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        assert_eq!(TicketStats::from_tickets(&[]), TicketStats::default());
    }

    #[test]
    fn test_sample_stats() {
        let stats = TicketStats::from_tickets(&Ticket::samples());
        assert_eq!(
            stats,
            TicketStats {
                total: 3,
                open: 1,
                in_progress: 1,
                closed: 1,
            }
        );
        assert_eq!(stats.count(TicketStatus::InProgress), 1);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let json = serde_json::to_value(TicketStats::default()).unwrap();
        assert!(json.get("inProgress").is_some());
    }
}
