use thiserror::Error;

use crate::models::TokenPair;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    CredentialRejected,

    #[error("Session expired - please log in again")]
    RefreshRejected,

    #[error("Not logged in")]
    NoSession,

    #[error("Could not reach the server: {0}")]
    Transport(String),
}

impl AuthError {
    /// Whether this failure means the client no longer holds a session.
    pub fn ends_session(&self) -> bool {
        matches!(self, AuthError::RefreshRejected | AuthError::NoSession)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Transport(e.to_string())
    }
}

/// Result of a refresh attempt, branched on by callers instead of matching
/// on error strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(TokenPair),
    /// The backend refused the refresh token; the session has been ended.
    Rejected,
    /// There was no session to refresh, or it ended while the refresh was in flight.
    NoSession,
    /// The backend could not be reached; the session is left as it was.
    TransportFailure(String),
}

impl RefreshOutcome {
    pub fn into_result(self) -> Result<TokenPair, AuthError> {
        match self {
            RefreshOutcome::Refreshed(pair) => Ok(pair),
            RefreshOutcome::Rejected => Err(AuthError::RefreshRejected),
            RefreshOutcome::NoSession => Err(AuthError::NoSession),
            RefreshOutcome::TransportFailure(msg) => Err(AuthError::Transport(msg)),
        }
    }
}
