//! Data models shared by the session core and its consumers.
//!
//! - `TokenPair`: the access/refresh credential bundle
//! - `LoginResponse`, `RefreshResponse`: auth endpoint payloads
//! - `TicketResponse`, `TicketStatus`: ticket validation payloads

pub mod ticket;
pub mod token;

pub use ticket::{TicketResponse, TicketStatus};
pub use token::{LoginResponse, RefreshResponse, TokenPair, TokenType};
