//! Staff ticket validation: status check at the door and scan on entry.

use tracing::info;
use uuid::Uuid;

use super::{ApiClient, ApiError};
use crate::models::TicketResponse;

const CHECK_STATUS_PATH: &str = "/auth/ticket-validation/check-status";
const SCAN_PATH: &str = "/auth/ticket-validation/scan";

#[derive(Clone)]
pub struct TicketValidation {
    api: ApiClient,
}

impl TicketValidation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Look up a ticket without changing it.
    pub async fn check_ticket(&self, ticket_id: Uuid) -> Result<TicketResponse, ApiError> {
        let id = ticket_id.to_string();
        self.api.get(CHECK_STATUS_PATH, &[("ticketId", id.as_str())]).await
    }

    /// Mark a ticket as used.
    pub async fn scan_ticket(&self, ticket_id: Uuid) -> Result<TicketResponse, ApiError> {
        let id = ticket_id.to_string();
        let ticket: TicketResponse = self.api.put(SCAN_PATH, &[("ticketId", id.as_str())]).await?;
        info!(ticket_id = %ticket.ticket_id, status = ?ticket.status, "Ticket scanned");
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionState;
    use crate::models::{TicketStatus, TokenPair};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TICKET: &str = "6f1c2a4e-8d1b-4c55-9a0e-3b2f7d9e1c40";

    fn tickets(server: &MockServer) -> TicketValidation {
        let session = Arc::new(SessionState::in_memory());
        session.begin(TokenPair::new("A1", "R1"));
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5), session).expect("client builds");
        TicketValidation::new(api)
    }

    fn ticket_json(status: &str) -> serde_json::Value {
        json!({
            "seatNumbers": ["C7"],
            "movieTitle": "Stalker",
            "screeningStartTime": "2025-06-01T20:00:00",
            "ticketId": TICKET,
            "status": status
        })
    }

    #[tokio::test]
    async fn test_check_ticket_sends_bearer_and_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHECK_STATUS_PATH))
            .and(query_param("ticketId", TICKET))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json("VALID")))
            .expect(1)
            .mount(&server)
            .await;

        let id = Uuid::parse_str(TICKET).expect("valid uuid");
        let ticket = tickets(&server).check_ticket(id).await.expect("ticket found");
        assert_eq!(ticket.status, TicketStatus::Valid);
        assert_eq!(ticket.seats_display(), "C7");
    }

    #[tokio::test]
    async fn test_scan_ticket_uses_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(SCAN_PATH))
            .and(query_param("ticketId", TICKET))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json("USED")))
            .expect(1)
            .mount(&server)
            .await;

        let id = Uuid::parse_str(TICKET).expect("valid uuid");
        let ticket = tickets(&server).scan_ticket(id).await.expect("ticket scanned");
        assert_eq!(ticket.status, TicketStatus::Used);
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHECK_STATUS_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such ticket"))
            .mount(&server)
            .await;

        let err = tickets(&server).check_ticket(Uuid::nil()).await.expect_err("missing ticket");
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
