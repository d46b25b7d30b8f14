//! Account store port.
//!
//! The store is the single authoritative source of account and task state.
//! The API server may run as any number of stateless replicas, so no
//! in-process lock can guard the task state machine; instead every racy
//! transition is expressed as a single conditional update that the backend
//! applies atomically. Implementations report whether the condition held via
//! the boolean return values below, and callers branch on that, never on a
//! prior read.

pub mod memory;
pub mod postgres;

use crate::models::{Account, NewAccount};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryAccountStore;
pub use postgres::{create_pool, run_migrations, DatabaseConfig, PostgresAccountStore};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Account persistence contract.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Creates an account with its initial session token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEmail`] when the normalized email is
    /// already registered.
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    /// Finds an account by ID. Returns `None` when it does not exist.
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;

    /// Finds an account by normalized email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Finds the account whose current session token equals `token`.
    ///
    /// Exact match only; a rotated-out token matches nothing.
    async fn find_by_session_token(&self, token: &str) -> StoreResult<Option<Account>>;

    /// Overwrites the account's session token, invalidating the previous one
    /// from that instant onward.
    ///
    /// Returns `false` when the account does not exist.
    async fn replace_session_token(&self, id: Uuid, token: &str) -> StoreResult<bool>;

    /// Atomic trigger guard: flips the account to `Running`, clears the old
    /// result, and stamps `run_id` / `started_at`, but only if the account
    /// is not already `Running`.
    ///
    /// This must be one indivisible operation against the backend; the gap
    /// between a read and a separate write is exactly the race this method
    /// exists to close. Returns `true` iff the caller won the transition.
    async fn begin_profile_run(
        &self,
        id: Uuid,
        run_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Records a run's terminal result, conditioned on the account still
    /// being in the `Running` state of that exact run.
    ///
    /// A stale worker (its run was reaped and a new one started) or a
    /// duplicate delivery affects zero rows and gets `false` back.
    async fn finish_profile_run(
        &self,
        id: Uuid,
        run_id: Uuid,
        result: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Returns the account to `Idle` after a run gave up, under the same
    /// run-identity condition as [`finish_profile_run`].
    ///
    /// [`finish_profile_run`]: AccountStore::finish_profile_run
    async fn abort_profile_run(&self, id: Uuid, run_id: Uuid) -> StoreResult<bool>;

    /// Returns every `Running` account whose run started before `cutoff` to
    /// `Idle`, so a crashed worker cannot leave an account stuck forever.
    ///
    /// Returns the number of accounts reset.
    async fn reset_stale_runs(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// Errors returned by account store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The normalized email is already registered.
    #[error("email already taken: {0}")]
    DuplicateEmail(String),

    /// Backend failure (connection loss, poisoned lock, malformed row).
    #[error("store backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
