//! Assembly of the session core.
//!
//! `Desk` wires one credential store, session state, API client, route guard
//! and ticket service together. Each `Desk` is independent; nothing here is
//! global, so tests can run isolated sessions side by side.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::api::{ApiClient, TicketValidation};
use crate::auth::{CredentialStore, SessionState, TokenStorage};
use crate::config::Config;
use crate::guard::{GuardDecision, Route, RouteGuard};

pub struct Desk {
    config: Config,
    session: Arc<SessionState>,
    api: ApiClient,
    guard: RouteGuard,
    tickets: TicketValidation,
}

impl Desk {
    /// Open a desk using the storage backend named in `config`.
    pub fn open(config: Config) -> Result<Self> {
        let storage = config.token_storage()?;
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Box<dyn TokenStorage>) -> Result<Self> {
        config.validate()?;
        let session = Arc::new(SessionState::hydrate(CredentialStore::open(storage)));
        let api = ApiClient::from_config(&config, session.clone())?;
        let guard = RouteGuard::new(session.clone());
        let tickets = TicketValidation::new(api.clone());
        debug!(api = %config.api_base_url, authenticated = session.is_authenticated(), "Desk ready");
        Ok(Self {
            config,
            session,
            api,
            guard,
            tickets,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn tickets(&self) -> &TicketValidation {
        &self.tickets
    }

    /// Resolve a route path and decide whether it may be entered.
    pub fn navigate(&self, path: &str) -> (Route, GuardDecision) {
        let route = Route::parse(path);
        (route, self.guard.check(route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryStorage, StoredTokens};
    use crate::config::StorageBackend;

    fn memory_config() -> Config {
        Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        }
    }

    #[test]
    fn test_desk_hydrates_existing_session() {
        let storage = MemoryStorage::with_tokens(StoredTokens {
            access_token: Some("A1".to_string()),
            refresh_token: Some("R1".to_string()),
        });
        let desk = Desk::with_storage(memory_config(), Box::new(storage)).expect("desk opens");
        assert!(desk.session().is_authenticated());
        assert_eq!(desk.navigate("/check-ticket"), (Route::CheckTicket, GuardDecision::Enter));
    }

    #[test]
    fn test_desks_are_isolated() {
        let a = Desk::open(memory_config()).expect("desk opens");
        let b = Desk::open(memory_config()).expect("desk opens");
        a.session().begin(crate::models::TokenPair::new("A1", "R1"));

        assert!(a.session().is_authenticated());
        assert!(!b.session().is_authenticated());
        assert_eq!(
            b.navigate("/scan-ticket"),
            (Route::ScanTicket, GuardDecision::Redirect(Route::Repertoire))
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            api_base_url: "localhost".to_string(),
            ..memory_config()
        };
        assert!(Desk::open(config).is_err());
    }
}
