//! REST API client module for the cinema backend.
//!
//! This module provides the `ApiClient`, which attaches the session's access
//! token to outgoing requests and recovers from an expired token with a
//! single refresh-and-retry, plus the thin `TicketValidation` service built
//! on top of it.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod tickets;

pub use client::ApiClient;
pub use endpoints::{AuthEndpointMatcher, Endpoints};
pub use error::ApiError;
pub use tickets::TicketValidation;
