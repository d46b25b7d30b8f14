//! Database models and data structures.

pub mod account;

pub use account::{normalize_email, Account, NewAccount, TaskState};
