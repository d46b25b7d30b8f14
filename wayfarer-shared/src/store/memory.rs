//! In-memory account store for tests and local experiments.
//!
//! Each operation takes the map's write lock for its whole duration, which
//! makes the conditional updates atomic with the same observable semantics
//! as the Postgres adapter's single-statement updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::models::{Account, NewAccount, TaskState};
use crate::store::{AccountStore, StoreError, StoreResult};

/// Thread-safe in-memory account store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().map_err(lock_error)?;

        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail(account.email));
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            session_token: account.session_token,
            task_state: TaskState::Idle,
            task_result: None,
            task_run_id: None,
            task_started_at: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().map_err(lock_error)?;
        Ok(accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().map_err(lock_error)?;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_session_token(&self, token: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().map_err(lock_error)?;
        Ok(accounts.values().find(|a| a.session_token == token).cloned())
    }

    async fn replace_session_token(&self, id: Uuid, token: &str) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().map_err(lock_error)?;
        match accounts.get_mut(&id) {
            Some(account) => {
                account.session_token = token.to_string();
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn begin_profile_run(
        &self,
        id: Uuid,
        run_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().map_err(lock_error)?;
        match accounts.get_mut(&id) {
            Some(account) if account.task_state != TaskState::Running => {
                account.task_state = TaskState::Running;
                account.task_result = None;
                account.task_run_id = Some(run_id);
                account.task_started_at = Some(now);
                account.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finish_profile_run(
        &self,
        id: Uuid,
        run_id: Uuid,
        result: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().map_err(lock_error)?;
        match accounts.get_mut(&id) {
            Some(account)
                if account.task_state == TaskState::Running
                    && account.task_run_id == Some(run_id) =>
            {
                account.task_state = TaskState::Complete;
                account.task_result = Some(result.to_string());
                account.task_run_id = None;
                account.task_started_at = None;
                account.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn abort_profile_run(&self, id: Uuid, run_id: Uuid) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().map_err(lock_error)?;
        match accounts.get_mut(&id) {
            Some(account)
                if account.task_state == TaskState::Running
                    && account.task_run_id == Some(run_id) =>
            {
                account.task_state = TaskState::Idle;
                account.task_result = None;
                account.task_run_id = None;
                account.task_started_at = None;
                account.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_stale_runs(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut accounts = self.accounts.write().map_err(lock_error)?;
        let now = Utc::now();
        let mut reset = 0u64;

        for account in accounts.values_mut() {
            let stale = account.task_state == TaskState::Running
                && account.task_started_at.is_some_and(|t| t < cutoff);
            if stale {
                account.task_state = TaskState::Idle;
                account.task_result = None;
                account.task_run_id = None;
                account.task_started_at = None;
                account.updated_at = now;
                reset += 1;
            }
        }

        Ok(reset)
    }
}
