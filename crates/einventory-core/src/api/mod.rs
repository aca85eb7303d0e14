//! REST client module for the E-Inventory identity service.
//!
//! This module provides the `IdentityService` seam the session core talks
//! to, and `ApiClient`, its HTTP implementation.
//!
//! The service issues JWT bearer tokens from the login endpoint; every other
//! call carries the token in the `Authorization` header.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, IdentityService};
pub use error::ApiError;
pub use types::{LoginRequest, LoginResponse, Profile, Site};
