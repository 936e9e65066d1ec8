use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Valid,
    Used,
    Expired,
    ToBeCalculated,
}

impl TicketStatus {
    pub fn display(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "already used",
            TicketStatus::Expired => "expired",
            TicketStatus::ToBeCalculated => "pending",
        }
    }

    /// Whether the holder may be admitted
    pub fn admits(&self) -> bool {
        matches!(self, TicketStatus::Valid)
    }
}

/// Ticket as returned by the ticket validation endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    #[serde(default)]
    pub seat_numbers: Vec<String>,
    pub movie_title: Option<String>,
    pub screening_start_time: Option<NaiveDateTime>,
    pub ticket_id: Uuid,
    pub status: TicketStatus,
}

impl TicketResponse {
    pub fn seats_display(&self) -> String {
        if self.seat_numbers.is_empty() {
            "-".to_string()
        } else {
            self.seat_numbers.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticket_response() {
        let json = r#"{"seatNumbers":["A1","A2"],"movieTitle":"Solaris","screeningStartTime":"2025-06-01T18:30:00","ticketId":"6f1c2a4e-8d1b-4c55-9a0e-3b2f7d9e1c40","status":"TO_BE_CALCULATED"}"#;
        let ticket: TicketResponse = serde_json::from_str(json).expect("valid ticket json");
        assert_eq!(ticket.status, TicketStatus::ToBeCalculated);
        assert_eq!(ticket.movie_title.as_deref(), Some("Solaris"));
        assert_eq!(ticket.seats_display(), "A1, A2");
        assert!(!ticket.status.admits());
    }

    #[test]
    fn test_ticket_status_admits_only_valid() {
        assert!(TicketStatus::Valid.admits());
        assert!(!TicketStatus::Used.admits());
        assert!(!TicketStatus::Expired.admits());
    }
}
