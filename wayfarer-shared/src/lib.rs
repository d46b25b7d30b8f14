//! # Wayfarer Shared Library
//!
//! Shared types and business logic used by the Wayfarer API server and the
//! profile-generation worker.
//!
//! ## Module Organization
//!
//! - `models`: Account model and task state
//! - `store`: Account store port plus Postgres and in-memory adapters
//! - `auth`: Password hashing, session tokens, bearer authentication
//! - `profile`: Task state machine and status projection

pub mod auth;
pub mod models;
pub mod profile;
pub mod store;

/// Current version of the Wayfarer shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
