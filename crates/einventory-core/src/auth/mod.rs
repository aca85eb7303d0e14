//! Session lifecycle for the console.
//!
//! This module provides:
//! - `SessionContext`: single owner of the `{token, profile}` state
//! - `TokenStore`: durable token storage (file or OS keychain)
//! - `ProfileFetcher`: profile retrieval keyed to the token it was issued for
//! - `InactivityMonitor`: closes the session after a window without input
//! - `AccessGate`: decides whether a location may be shown
//! - `LoginFlow`: form validation, sign-in, and the startup token check

pub mod gate;
pub mod inactivity;
pub mod login;
pub mod profile;
pub mod session;
pub mod store;
pub mod token;

pub use gate::{AccessGate, Admission};
pub use inactivity::{
    ActivityKind, InactivityGuard, InactivityMonitor, MonitorError, MonitorState, SessionEvent,
};
pub use login::{
    LoginError, LoginFlow, LoginForm, LoginOutcome, MountReport, StoredTokenCheck,
    ValidationErrors, Violation,
};
pub use profile::ProfileFetcher;
pub use session::{SessionContext, SessionState};
pub use store::{open_store, FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use token::Token;
