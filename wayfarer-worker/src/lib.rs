//! # Wayfarer Worker
//!
//! Asynchronous execution of profile-generation runs, decoupled from the
//! HTTP request lifecycle.
//!
//! ## Module Organization
//!
//! - `queue`: typed job queue between the API and the worker pool
//! - `generator`: the (simulated) external profile-generation call
//! - `worker`: the pool consuming jobs and writing terminal state
//! - `reaper`: timeout recovery for runs whose worker died

pub mod generator;
pub mod queue;
pub mod reaper;
pub mod worker;

/// Current version of the Wayfarer worker crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
