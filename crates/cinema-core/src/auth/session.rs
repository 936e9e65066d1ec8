//! Session state: the credential store and its published projection.
//!
//! Every mutation (login, refresh, logout) runs as one unit under a single
//! lock: the store is written and the new flag is published before the lock
//! is released, so no reader observes one without the other.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use super::publisher::{SessionPublisher, Subscription};
use super::store::CredentialStore;
use crate::models::TokenPair;

/// Identifies one login-to-logout lifetime. Bumped on every login and logout,
/// left alone by refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

struct Inner {
    store: CredentialStore,
    publisher: SessionPublisher,
    epoch: u64,
}

pub struct SessionState {
    inner: Mutex<Inner>,
}

impl SessionState {
    /// Build the session from a store that has already hydrated from disk.
    pub fn hydrate(store: CredentialStore) -> Self {
        let authenticated = store.has_session();
        info!(backend = store.backend_name(), authenticated, "Session hydrated");
        Self {
            inner: Mutex::new(Inner {
                store,
                publisher: SessionPublisher::new(authenticated),
                epoch: 0,
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::hydrate(CredentialStore::in_memory())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.lock().store.read()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().store.access_token().map(str::to_string)
    }

    /// Access token and the epoch it belongs to, read together.
    pub(crate) fn access_token_with_epoch(&self) -> (Option<String>, Epoch) {
        let inner = self.lock();
        (inner.store.access_token().map(str::to_string), Epoch(inner.epoch))
    }

    pub fn has_session(&self) -> bool {
        self.lock().store.has_session()
    }

    /// The published flag. Always equal to `has_session()` outside a mutation.
    pub fn is_authenticated(&self) -> bool {
        self.lock().publisher.current()
    }

    pub fn subscribe(&self) -> Subscription {
        self.lock().publisher.subscribe()
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.lock().epoch)
    }

    /// Current pair together with the epoch it belongs to.
    pub(crate) fn snapshot(&self) -> Option<(TokenPair, Epoch)> {
        let inner = self.lock();
        inner.store.read().map(|pair| (pair, Epoch(inner.epoch)))
    }

    /// Start a new session with a freshly issued pair.
    pub(crate) fn begin(&self, pair: TokenPair) -> Epoch {
        let mut inner = self.lock();
        inner.store.write(pair);
        inner.epoch += 1;
        inner.publisher.publish(true);
        debug!(epoch = inner.epoch, "Session started");
        Epoch(inner.epoch)
    }

    /// Store a refreshed pair, unless the session it was refreshed for has
    /// since ended or been replaced. Returns whether the pair was stored.
    pub(crate) fn commit_refresh(&self, epoch: Epoch, pair: TokenPair) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch.0 || !inner.store.has_session() {
            debug!(started = epoch.0, now = inner.epoch, "Discarding refresh for a superseded session");
            return false;
        }
        inner.store.write(pair);
        inner.publisher.publish(true);
        true
    }

    /// End the current session. A no-op when there is none.
    pub(crate) fn end(&self) -> bool {
        let mut inner = self.lock();
        Self::end_locked(&mut inner)
    }

    /// End the session only if it is still the one identified by `epoch`.
    pub(crate) fn end_if_current(&self, epoch: Epoch) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch.0 {
            return false;
        }
        Self::end_locked(&mut inner)
    }

    fn end_locked(inner: &mut Inner) -> bool {
        if !inner.store.has_session() {
            return false;
        }
        inner.store.clear();
        inner.epoch += 1;
        inner.publisher.publish(false);
        debug!(epoch = inner.epoch, "Session ended");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryStorage;

    #[test]
    fn test_hydrates_published_flag_from_store() {
        let mut store = CredentialStore::open(Box::new(MemoryStorage::new()));
        store.write(TokenPair::new("A1", "R1"));
        let session = SessionState::hydrate(store);
        assert!(session.is_authenticated());
        assert!(session.has_session());

        let empty = SessionState::in_memory();
        assert!(!empty.is_authenticated());
    }

    #[test]
    fn test_begin_and_end_publish() {
        let session = SessionState::in_memory();
        let mut sub = session.subscribe();

        session.begin(TokenPair::new("A1", "R1"));
        assert!(session.is_authenticated());
        assert!(session.end());
        assert!(!session.is_authenticated());
        assert!(!session.has_session());

        assert_eq!(sub.drain(), vec![false, true, false]);
    }

    #[test]
    fn test_end_without_session_is_noop() {
        let session = SessionState::in_memory();
        let mut sub = session.subscribe();
        let before = session.epoch();

        assert!(!session.end());
        assert_eq!(session.epoch(), before);
        assert_eq!(sub.drain(), vec![false]);
    }

    #[test]
    fn test_refresh_commit_rejected_after_logout() {
        let session = SessionState::in_memory();
        session.begin(TokenPair::new("A1", "R1"));
        let (_, epoch) = session.snapshot().expect("active session");

        session.end();
        assert!(!session.commit_refresh(epoch, TokenPair::new("A2", "R1")));
        assert!(!session.has_session());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_refresh_commit_rejected_after_relogin() {
        let session = SessionState::in_memory();
        session.begin(TokenPair::new("A1", "R1"));
        let (_, epoch) = session.snapshot().expect("active session");

        session.begin(TokenPair::new("B1", "S1"));
        assert!(!session.commit_refresh(epoch, TokenPair::new("A2", "R1")));
        assert_eq!(session.tokens(), Some(TokenPair::new("B1", "S1")));
        // A stale failure must not log out the new session either
        assert!(!session.end_if_current(epoch));
        assert!(session.has_session());
    }

    #[test]
    fn test_refresh_commit_keeps_epoch() {
        let session = SessionState::in_memory();
        let epoch = session.begin(TokenPair::new("A1", "R1"));
        assert!(session.commit_refresh(epoch, TokenPair::new("A2", "R1")));
        assert_eq!(session.epoch(), epoch);
        assert_eq!(session.access_token().as_deref(), Some("A2"));
    }
}
