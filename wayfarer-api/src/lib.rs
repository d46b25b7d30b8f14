//! # Wayfarer API
//!
//! HTTP surface for the Wayfarer account and traveler-profile service:
//! session issuance and rotation, profile-generation triggering, and status
//! polling.
//!
//! ## Module Organization
//!
//! - `app`: application state and router assembly
//! - `config`: environment-driven configuration
//! - `error`: unified error type mapped to HTTP responses
//! - `routes`: endpoint handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;

/// Current version of the Wayfarer API crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
