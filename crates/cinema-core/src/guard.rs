//! Route table and the staff-only route guard.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::auth::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Repertoire,
    Reservation { screening_id: i64 },
    CheckTicket,
    ScanTicket,
}

impl Route {
    /// Parse a route path. Unknown paths fall back to the repertoire.
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["repertoire"] => Route::Repertoire,
            ["reservation", id] => id
                .parse()
                .map(|screening_id| Route::Reservation { screening_id })
                .unwrap_or_default(),
            ["check-ticket"] => Route::CheckTicket,
            ["scan-ticket"] => Route::ScanTicket,
            _ => Route::Repertoire,
        }
    }

    pub fn is_staff_only(&self) -> bool {
        matches!(self, Route::CheckTicket | Route::ScanTicket)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Repertoire => write!(f, "/repertoire"),
            Route::Reservation { screening_id } => write!(f, "/reservation/{}", screening_id),
            Route::CheckTicket => write!(f, "/check-ticket"),
            Route::ScanTicket => write!(f, "/scan-ticket"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Enter,
    Redirect(Route),
}

/// Gates staff-only routes on the published session flag. Never mutates
/// the session.
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<SessionState>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionState>) -> Self {
        Self { session }
    }

    /// True when a staff session is active
    pub fn can_activate(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn check(&self, route: Route) -> GuardDecision {
        if !route.is_staff_only() || self.can_activate() {
            GuardDecision::Enter
        } else {
            debug!(route = %route, "Staff-only route without a session, redirecting");
            GuardDecision::Redirect(Route::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPair;

    #[test]
    fn test_parse_routes() {
        assert_eq!(Route::parse("/repertoire"), Route::Repertoire);
        assert_eq!(Route::parse("/reservation/42"), Route::Reservation { screening_id: 42 });
        assert_eq!(Route::parse("check-ticket"), Route::CheckTicket);
        assert_eq!(Route::parse("/scan-ticket/"), Route::ScanTicket);
        // Wildcard and empty paths redirect to the repertoire
        assert_eq!(Route::parse(""), Route::Repertoire);
        assert_eq!(Route::parse("/nope"), Route::Repertoire);
        assert_eq!(Route::parse("/reservation/abc"), Route::Repertoire);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for route in [
            Route::Repertoire,
            Route::Reservation { screening_id: 7 },
            Route::CheckTicket,
            Route::ScanTicket,
        ] {
            assert_eq!(Route::parse(&route.to_string()), route);
        }
    }

    #[test]
    fn test_guard_redirects_without_session() {
        let session = Arc::new(SessionState::in_memory());
        let guard = RouteGuard::new(session.clone());

        assert_eq!(guard.check(Route::CheckTicket), GuardDecision::Redirect(Route::Repertoire));
        assert_eq!(guard.check(Route::ScanTicket), GuardDecision::Redirect(Route::Repertoire));
        assert_eq!(guard.check(Route::Repertoire), GuardDecision::Enter);
        assert_eq!(guard.check(Route::Reservation { screening_id: 1 }), GuardDecision::Enter);
        // Checking never creates or ends a session
        assert!(!session.has_session());
    }

    #[test]
    fn test_guard_follows_session_changes() {
        let session = Arc::new(SessionState::in_memory());
        let guard = RouteGuard::new(session.clone());

        session.begin(TokenPair::new("A1", "R1"));
        assert!(guard.can_activate());
        assert_eq!(guard.check(Route::CheckTicket), GuardDecision::Enter);

        session.end();
        assert!(!guard.can_activate());
        assert_eq!(guard.check(Route::CheckTicket), GuardDecision::Redirect(Route::Repertoire));
    }
}
