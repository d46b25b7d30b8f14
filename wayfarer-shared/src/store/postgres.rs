//! Postgres account store adapter.
//!
//! Every racy transition is a single `UPDATE ... WHERE <precondition>`
//! statement; Postgres applies the row lock and the write as one indivisible
//! step, and `rows_affected()` tells the caller whether the precondition
//! held. No advisory locks or transactions are needed for the state machine
//! because each transition fits in one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Account, NewAccount, TaskState};
use crate::store::{AccountStore, StoreError, StoreResult};

/// Configuration for the database connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Timeout for acquiring a connection from the pool (seconds)
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            connect_timeout_seconds: 30,
        }
    }
}

/// Creates a PostgreSQL connection pool and verifies connectivity.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database is unreachable.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .connect(&config.url)
        .await?;

    // Health check before handing the pool out
    let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;
    debug!("Database health check passed");

    Ok(pool)
}

/// Runs all pending migrations from the crate's `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await
}

/// Account store backed by Postgres.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Wraps an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw row shape; `task_state` arrives as text and is parsed on the way out.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    session_token: String,
    task_state: String,
    task_result: Option<String>,
    task_run_id: Option<Uuid>,
    task_started_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let task_state: TaskState = row.task_state.parse().map_err(StoreError::backend)?;
        Ok(Account {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            session_token: row.session_token,
            task_state,
            task_result: row.task_result,
            task_run_id: row.task_run_id,
            task_started_at: row.task_started_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, session_token, task_state, \
     task_result, task_run_id, task_started_at, created_at, updated_at";

impl PostgresAccountStore {
    async fn fetch_one_by(&self, column: &str, value: &str) -> StoreResult<Option<Account>> {
        // column comes from a fixed set of callers, never from input
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = $1");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        row.map(Account::try_from).transpose()
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (email, password_hash, session_token)
            VALUES ($1, $2, $3)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.session_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err)
                if db_err.constraint().is_some_and(|c| c.contains("email")) =>
            {
                StoreError::DuplicateEmail(account.email.clone())
            }
            _ => StoreError::backend(err),
        })?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.fetch_one_by("email", email).await
    }

    async fn find_by_session_token(&self, token: &str) -> StoreResult<Option<Account>> {
        self.fetch_one_by("session_token", token).await
    }

    async fn replace_session_token(&self, id: Uuid, token: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET session_token = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn begin_profile_run(
        &self,
        id: Uuid,
        run_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // The WHERE clause is the trigger guard: two concurrent calls both
        // reach Postgres, but only one affects the row.
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET task_state = 'running',
                task_result = NULL,
                task_run_id = $2,
                task_started_at = $3,
                updated_at = $3
            WHERE id = $1 AND task_state <> 'running'
            "#,
        )
        .bind(id)
        .bind(run_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn finish_profile_run(
        &self,
        id: Uuid,
        run_id: Uuid,
        result: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let outcome = sqlx::query(
            r#"
            UPDATE accounts
            SET task_state = 'complete',
                task_result = $3,
                task_run_id = NULL,
                task_started_at = NULL,
                updated_at = $4
            WHERE id = $1 AND task_state = 'running' AND task_run_id = $2
            "#,
        )
        .bind(id)
        .bind(run_id)
        .bind(result)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(outcome.rows_affected() > 0)
    }

    async fn abort_profile_run(&self, id: Uuid, run_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET task_state = 'idle',
                task_result = NULL,
                task_run_id = NULL,
                task_started_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND task_state = 'running' AND task_run_id = $2
            "#,
        )
        .bind(id)
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_stale_runs(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET task_state = 'idle',
                task_result = NULL,
                task_run_id = NULL,
                task_started_at = NULL,
                updated_at = NOW()
            WHERE task_state = 'running' AND task_started_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }
}
