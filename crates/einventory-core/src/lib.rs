//! Core library for the E-Inventory console.
//!
//! The console's protected views are only reachable with a session. This
//! crate owns that session: the identity service client, token storage, the
//! session context and its observers, the inactivity monitor, the access
//! gate, and the login flow.

pub mod api;
pub mod auth;
pub mod config;
pub mod nav;

pub use api::{ApiClient, ApiError, IdentityService};
pub use auth::{SessionContext, SessionState, Token};
pub use config::Config;
pub use nav::{Location, NavigationIntent, Router};
