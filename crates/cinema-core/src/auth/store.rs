//! Durable token persistence.
//!
//! `CredentialStore` is the single owner of the current `TokenPair`. It keeps
//! an in-process copy and writes through to a `TokenStorage` backend so the
//! session survives restarts. Backend failures never escape this module: an
//! unreadable backend hydrates as "no session", a failed write keeps the pair
//! in memory for the lifetime of the process.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::token::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::models::TokenPair;

/// Keychain service name for the keyring backend
const KEYRING_SERVICE: &str = "cinema-desk";

/// Raw values as found in a backend. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<&TokenPair> for StoredTokens {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access_token: Some(pair.access_token.clone()),
            refresh_token: Some(pair.refresh_token.clone()),
        }
    }
}

/// A key/value backend holding the two token values under fixed keys.
pub trait TokenStorage: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    fn read(&self) -> Result<StoredTokens>;

    /// Replace both values. Implementations should not leave a half pair behind.
    fn write(&self, pair: &TokenPair) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Overwrite both values with something that hydrates as "no session".
    /// Fallback for backends that can replace a value but failed to remove it.
    fn write_empty(&self) -> Result<()>;
}

// ============================================================================
// Backends
// ============================================================================

/// In-memory backend. Used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStorage {
    tokens: Mutex<StoredTokens>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with raw values, e.g. a half pair left by a crash.
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, StoredTokens> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self) -> Result<StoredTokens> {
        Ok(self.guard().clone())
    }

    fn write(&self, pair: &TokenPair) -> Result<()> {
        *self.guard() = StoredTokens::from(pair);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.guard() = StoredTokens::default();
        Ok(())
    }

    fn write_empty(&self) -> Result<()> {
        self.clear()
    }
}

/// JSON file backend. Both keys live in one object that is replaced with a
/// rename, so readers see either the old pair or the new one.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_tokens(&self, tokens: &StoredTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace session file")?;
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn read(&self) -> Result<StoredTokens> {
        if !self.path.exists() {
            return Ok(StoredTokens::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn write(&self, pair: &TokenPair) -> Result<()> {
        self.write_tokens(&StoredTokens::from(pair))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    fn write_empty(&self) -> Result<()> {
        self.write_tokens(&StoredTokens::default())
    }
}

/// OS keychain backend, one entry per token key.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStorage for KeyringStorage {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn read(&self) -> Result<StoredTokens> {
        Ok(StoredTokens {
            access_token: self.get(ACCESS_TOKEN_KEY)?,
            refresh_token: self.get(REFRESH_TOKEN_KEY)?,
        })
    }

    // Refresh first: a crash between the two writes leaves a stale access
    // token next to a fresh refresh token, which still refreshes cleanly.
    fn write(&self, pair: &TokenPair) -> Result<()> {
        self.entry(REFRESH_TOKEN_KEY)?
            .set_password(&pair.refresh_token)
            .context("Failed to store refresh token in keychain")?;
        self.entry(ACCESS_TOKEN_KEY)?
            .set_password(&pair.access_token)
            .context("Failed to store access token in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.delete(ACCESS_TOKEN_KEY)?;
        self.delete(REFRESH_TOKEN_KEY)
    }

    // Empty values never form a pair, so the next start has no session.
    fn write_empty(&self) -> Result<()> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            self.entry(key)?
                .set_password("")
                .context("Failed to blank token in keychain")?;
        }
        Ok(())
    }
}

// ============================================================================
// Credential store
// ============================================================================

pub struct CredentialStore {
    backend: Box<dyn TokenStorage>,
    current: Option<TokenPair>,
}

impl CredentialStore {
    /// Open a store over `backend`, hydrating the current pair from it.
    pub fn open(backend: Box<dyn TokenStorage>) -> Self {
        let current = match backend.read() {
            Ok(stored) => {
                let has_any = !stored.is_empty();
                let pair = TokenPair::from_parts(stored.access_token, stored.refresh_token);
                if pair.is_none() && has_any {
                    warn!(backend = backend.name(), "Discarding incomplete token pair");
                    if let Err(e) = backend.clear() {
                        warn!(backend = backend.name(), error = %e, "Failed to clear incomplete token pair");
                    }
                }
                pair
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Token storage unavailable, starting without a session");
                None
            }
        };
        debug!(backend = backend.name(), has_session = current.is_some(), "Credential store opened");
        Self { backend, current }
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryStorage::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn write(&mut self, pair: TokenPair) {
        if let Err(e) = self.backend.write(&pair) {
            warn!(backend = self.backend.name(), error = %e, "Failed to persist tokens, keeping them in memory only");
        }
        self.current = Some(pair);
    }

    pub fn read(&self) -> Option<TokenPair> {
        self.current.clone()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.current.as_ref().map(|p| p.access_token.as_str())
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.backend.clear() {
            warn!(backend = self.backend.name(), error = %e, "Failed to remove persisted tokens, overwriting them");
            if let Err(e) = self.backend.write_empty() {
                warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "Failed to overwrite persisted tokens, the session may be restored on next start"
                );
            }
        }
        if self.current.take().is_some() {
            info!(backend = self.backend.name(), "Credentials cleared");
        }
    }

    pub fn has_session(&self) -> bool {
        self.current.is_some()
    }
}
