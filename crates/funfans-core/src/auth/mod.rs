//! Admin authentication: a username/password gate with a one-hour session.
//!
//! This module provides:
//! - `SessionGuard`: login, logout and lazy expiry of the admin session
//! - `Credentials`: the configured admin pair, with an insecure fallback
//! - `SessionStore`: where the session entries live (`MemoryStore`, `FileStore`)
//! - `Clock`: injectable time source (`SystemClock`, `ManualClock`)

pub mod clock;
pub mod credentials;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::Credentials;
pub use session::{Session, SessionGuard, SessionStatus, DEFAULT_NAMESPACE, SESSION_TTL_MINUTES};
pub use store::{FileStore, MemoryStore, SessionStore};
