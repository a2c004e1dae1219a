//! FunFansPlay admin core.
//!
//! The time-limited admin session guard and the configuration it runs with.
//! The terminal console in `funfans-tui` is the main consumer, but the guard
//! has no terminal dependencies and can be embedded elsewhere.

pub mod auth;
pub mod config;
pub mod error;

pub use auth::{Credentials, SessionGuard, SessionStatus};
pub use config::Config;
pub use error::StoreError;
