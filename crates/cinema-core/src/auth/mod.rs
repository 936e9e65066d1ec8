//! Authentication module for managing the staff session.
//!
//! This module provides:
//! - `CredentialStore`: durable storage of the access/refresh token pair
//! - `SessionPublisher`: broadcast of the "authenticated" flag
//! - `SessionState`: the store and publisher updated as one unit
//! - `AuthGateway`: login, refresh and logout against the backend

pub mod error;
pub mod gateway;
pub mod publisher;
pub mod session;
pub mod store;

pub use error::{AuthError, RefreshOutcome};
pub use gateway::AuthGateway;
pub use publisher::{SessionPublisher, Subscription};
pub use session::{Epoch, SessionState};
pub use store::{CredentialStore, FileStorage, KeyringStorage, MemoryStorage, StoredTokens, TokenStorage};
