/// Task state machine
///
/// Guarantees at most one in-flight profile-generation run per account,
/// using only the store's atomic conditional updates. No in-process locks,
/// because any number of stateless API replicas may be running.
///
/// # State machine
///
/// ```text
/// idle --try_start--> running --complete--> complete --try_start--> running
///                     running --abandon/reap--> idle
/// ```
///
/// Two concurrent `try_start` calls for one account yield exactly one
/// `Started`; the guarantee comes from the atomicity of the store's
/// conditional update, never from the ordering of observations.
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::profile::status::ProfileStatus;
use crate::store::{AccountStore, StoreError};

/// Result type for state machine operations.
pub type MachineResult<T> = Result<T, MachineError>;

/// Errors returned by the state machine.
#[derive(Debug, Clone, Error)]
pub enum MachineError {
    /// The account does not exist.
    #[error("account not found: {0}")]
    AccountMissing(Uuid),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identity of one accepted run.
///
/// The worker receives the ticket as its invocation argument (it never
/// re-derives which run it belongs to), and every terminal write it makes is
/// conditioned on the account still carrying this `run_id`. That is what
/// lets a slow or duplicate worker be detected and discarded instead of
/// stomping a newer run's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    /// Account the run belongs to
    pub account_id: Uuid,

    /// Unique identity of this run
    pub run_id: Uuid,
}

/// Outcome of a trigger attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The caller won the transition and must schedule the worker exactly
    /// once with this ticket.
    Started(RunTicket),

    /// Another run is already in flight; the caller must not schedule
    /// anything.
    AlreadyRunning,
}

/// Outcome of a terminal write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The result was recorded.
    Recorded,

    /// The account was no longer in this run's `Running` state (reaped,
    /// restarted, or already completed); the write was discarded.
    StaleRun,
}

/// Per-account profile-generation state machine over the account store.
#[derive(Clone)]
pub struct ProfileMachine {
    store: Arc<dyn AccountStore>,
}

impl ProfileMachine {
    /// Creates a state machine over the given store.
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Access to the underlying store.
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Attempts to begin a run for the account.
    ///
    /// One indivisible conditional update decides the race: "set Running and
    /// clear the old result, only if not already Running". There is no read
    /// followed by a separate write anywhere on this path.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::AccountMissing`] when the account does not
    /// exist (distinguished from a lost race by a follow-up existence read,
    /// which is safe because it only refines a rejection).
    pub async fn try_start(&self, account_id: Uuid) -> MachineResult<StartOutcome> {
        let run_id = Uuid::new_v4();
        let started = self
            .store
            .begin_profile_run(account_id, run_id, Utc::now())
            .await?;

        if started {
            tracing::info!(%account_id, %run_id, "Profile run started");
            return Ok(StartOutcome::Started(RunTicket { account_id, run_id }));
        }

        // Zero rows affected means either a lost race or no such account.
        match self.store.find_by_id(account_id).await? {
            Some(_) => Ok(StartOutcome::AlreadyRunning),
            None => Err(MachineError::AccountMissing(account_id)),
        }
    }

    /// Records a run's terminal result.
    ///
    /// Conditioned on the account still being in this run's `Running` state,
    /// so a completion arriving after the run was reaped and a newer one
    /// started is reported as [`CompleteOutcome::StaleRun`] and changes
    /// nothing. A duplicate delivery after a successful write lands in the
    /// same arm, which is what makes `complete` idempotent.
    pub async fn complete(&self, ticket: &RunTicket, result: &str) -> MachineResult<CompleteOutcome> {
        let recorded = self
            .store
            .finish_profile_run(ticket.account_id, ticket.run_id, result, Utc::now())
            .await?;

        if recorded {
            tracing::info!(
                account_id = %ticket.account_id,
                run_id = %ticket.run_id,
                result,
                "Profile run complete"
            );
            Ok(CompleteOutcome::Recorded)
        } else {
            tracing::warn!(
                account_id = %ticket.account_id,
                run_id = %ticket.run_id,
                "Discarding stale or duplicate completion"
            );
            Ok(CompleteOutcome::StaleRun)
        }
    }

    /// Returns the account to `Idle` after the worker gave up on this run.
    ///
    /// Same run-identity condition as [`complete`](Self::complete); returns
    /// whether the reset was applied.
    pub async fn abandon(&self, ticket: &RunTicket) -> MachineResult<bool> {
        let reset = self
            .store
            .abort_profile_run(ticket.account_id, ticket.run_id)
            .await?;
        if reset {
            tracing::warn!(
                account_id = %ticket.account_id,
                run_id = %ticket.run_id,
                "Profile run abandoned, account back to idle"
            );
        }
        Ok(reset)
    }

    /// Plain read of the account's current status; no side effects.
    pub async fn status(&self, account_id: Uuid) -> MachineResult<ProfileStatus> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(MachineError::AccountMissing(account_id))?;

        Ok(ProfileStatus::project(&account))
    }

    /// Resets every run older than `max_age` back to `Idle`.
    ///
    /// Bounds how long a crashed worker can leave an account stuck in
    /// `Running`; returns the number of accounts reset.
    pub async fn reap_stale(&self, max_age: Duration) -> MachineResult<u64> {
        let max_age = ChronoDuration::from_std(max_age).unwrap_or(ChronoDuration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(max_age)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        Ok(self.store.reset_stale_runs(cutoff).await?)
    }
}
