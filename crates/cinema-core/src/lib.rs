//! Session and authentication core for the cinema desk client.
//!
//! The core holds the staff session (an access/refresh token pair), attaches
//! it to backend requests, renews it transparently when the backend rejects
//! an expired access token, and publishes an "authenticated" flag that route
//! gating and UI code observe.

pub mod api;
pub mod auth;
pub mod config;
pub mod desk;
pub mod guard;
pub mod models;

pub use api::{ApiClient, ApiError, TicketValidation};
pub use auth::{AuthError, AuthGateway, RefreshOutcome, SessionState, Subscription};
pub use config::{Config, StorageBackend};
pub use desk::Desk;
pub use guard::{GuardDecision, Route, RouteGuard};
pub use models::{TicketResponse, TicketStatus, TokenPair};
