//! Login, refresh and logout against the backend's auth endpoints.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{AuthError, RefreshOutcome};
use super::session::{Epoch, SessionState};
use crate::api::endpoints::{Endpoints, REFRESH_TOKEN_HEADER};
use crate::models::{LoginResponse, RefreshResponse, TokenPair};

pub struct AuthGateway {
    client: Client,
    endpoints: Endpoints,
    session: Arc<SessionState>,
    /// Serialises refreshes so concurrent rejections share one renewal.
    /// Holds the epoch of the last session whose refresh token was refused.
    refresh_gate: Mutex<Option<Epoch>>,
}

impl AuthGateway {
    pub fn new(client: Client, endpoints: Endpoints, session: Arc<SessionState>) -> Self {
        Self {
            client,
            endpoints,
            session,
            refresh_gate: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Exchange a username and password for a new token pair.
    ///
    /// The store is only touched on success; a rejected or failed login
    /// leaves any existing session exactly as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let url = self.endpoints.login_url();
        debug!(username = username, "Sending login request");

        let response = self
            .client
            .post(&url)
            .basic_auth(username, Some(password))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Login request failed");
                AuthError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(if is_credential_rejection(status) {
                info!(username = username, status = status.as_u16(), "Login rejected");
                AuthError::CredentialRejected
            } else {
                warn!(status = status.as_u16(), "Login failed with unexpected status");
                AuthError::Transport(format!("server returned {}", status))
            });
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("invalid login response: {}", e)))?;
        let pair = TokenPair::from(body);
        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(AuthError::Transport("login response is missing a token".to_string()));
        }

        self.session.begin(pair.clone());
        info!(username = username, "Logged in");
        Ok(pair)
    }

    /// Exchange the stored refresh token for a new access token.
    pub async fn refresh(&self) -> Result<TokenPair, AuthError> {
        self.try_refresh().await.into_result()
    }

    /// Like `refresh`, but returns the tagged outcome.
    pub async fn try_refresh(&self) -> RefreshOutcome {
        let mut gate = self.refresh_gate.lock().await;
        self.refresh_locked(&mut gate).await
    }

    /// Refresh on behalf of a request whose `rejected` access token, sent
    /// during session `sent`, was refused.
    ///
    /// If another refresh already replaced that token while this caller
    /// waited for the gate, the newer pair is returned without another round
    /// trip. If that refresh was refused instead, the caller shares its
    /// `RefreshRejected` rather than seeing the logged-out state as
    /// `NoSession`.
    pub(crate) async fn refresh_after_rejection(
        &self,
        rejected: Option<&str>,
        sent: Epoch,
    ) -> Result<TokenPair, AuthError> {
        let mut gate = self.refresh_gate.lock().await;
        if *gate == Some(sent) {
            debug!("Refresh for this session was already rejected");
            return Err(AuthError::RefreshRejected);
        }
        if let Some(current) = self.session.tokens() {
            if rejected != Some(current.access_token.as_str()) {
                debug!("Access token already renewed by a concurrent refresh");
                return Ok(current);
            }
        }
        self.refresh_locked(&mut gate).await.into_result()
    }

    async fn refresh_locked(&self, last_rejected: &mut Option<Epoch>) -> RefreshOutcome {
        let Some((pair, epoch)) = self.session.snapshot() else {
            debug!("Refresh requested without a session");
            return RefreshOutcome::NoSession;
        };

        debug!("Sending refresh request");
        let response = match self
            .client
            .post(self.endpoints.refresh_url())
            .header(REFRESH_TOKEN_HEADER, &pair.refresh_token)
            .json(&serde_json::json!({}))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refresh request failed, keeping session");
                return RefreshOutcome::TransportFailure(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            if is_refresh_rejection(status) {
                warn!(status = status.as_u16(), "Refresh token rejected, ending session");
                self.session.end_if_current(epoch);
                *last_rejected = Some(epoch);
                return RefreshOutcome::Rejected;
            }
            warn!(status = status.as_u16(), "Refresh failed with unexpected status, keeping session");
            return RefreshOutcome::TransportFailure(format!("server returned {}", status));
        }

        let body: RefreshResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Invalid refresh response");
                return RefreshOutcome::TransportFailure(format!("invalid refresh response: {}", e));
            }
        };
        if body.access_token.is_empty() {
            return RefreshOutcome::TransportFailure("refresh response is missing a token".to_string());
        }

        let renewed = body.into_pair(&pair.refresh_token);
        if !self.session.commit_refresh(epoch, renewed.clone()) {
            return RefreshOutcome::NoSession;
        }
        info!("Access token refreshed");
        RefreshOutcome::Refreshed(renewed)
    }

    /// Drop the session. Returns `false` if there was none.
    pub fn logout(&self) -> bool {
        let ended = self.session.end();
        if ended {
            info!("Logged out");
        }
        ended
    }
}

fn is_credential_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    )
}

/// Statuses meaning the refresh token itself is no good. Anything else is
/// treated as an outage and leaves the session alone.
fn is_refresh_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::NOT_FOUND
    )
}
