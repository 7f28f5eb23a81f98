//! Authentication module for managing the admin session.
//!
//! This module provides:
//! - `CredentialStore`: token and profile persistence with expiry, over
//!   file, OS keychain or memory backends
//! - `SessionController`: session state machine with silent refresh
//! - `guard`: route definitions and the guards that protect them
//!
//! Sessions are persisted for one day and refreshed every 14 minutes.

pub mod credentials;
pub mod guard;
pub mod session;

pub use credentials::{
    CredentialStore, FileBackend, KeyValueBackend, KeyringBackend, MemoryBackend,
    StoredCredentials, SESSION_TTL_DAYS,
};
pub use guard::{resolve, Access, AdminPage, Guard, Route};
pub use session::{
    LogoutReason, SessionController, SessionData, SessionEvent, SessionState, REFRESH_INTERVAL,
};
