/// Account model
///
/// An account is a registered user together with the state of its one
/// long-running profile-generation task. Accounts are the only shared mutable
/// resource in the system: every piece of cross-request coordination is
/// expressed as a conditional update against this record.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     session_token TEXT NOT NULL UNIQUE,
///     task_state TEXT NOT NULL DEFAULT 'idle',
///     task_result TEXT,
///     task_run_id UUID,
///     task_started_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Profile-generation task state for an account.
///
/// Transitions are `Idle → Running → Complete → Running` (re-trigger), and
/// `Running → Idle` when a run is abandoned or reaped. Every transition into
/// `Running` goes through the atomic guard in the store; nothing else writes
/// this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// No run has happened yet, or the last run was abandoned
    Idle,

    /// A run is in flight; `task_run_id` identifies it
    Running,

    /// The last run finished; `task_result` carries its output
    Complete,
}

impl TaskState {
    /// String form used for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Idle => "idle",
            TaskState::Running => "running",
            TaskState::Complete => "complete",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = UnknownTaskState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(TaskState::Idle),
            "running" => Ok(TaskState::Running),
            "complete" => Ok(TaskState::Complete),
            other => Err(UnknownTaskState(other.to_string())),
        }
    }
}

/// Error for task-state strings that do not name a known state.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown task state: {0}")]
pub struct UnknownTaskState(pub String);

/// Account record.
///
/// Deliberately not `Serialize`: `password_hash` and `session_token` must
/// never leak through a response body by accident. Handlers build explicit
/// response types instead.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,

    /// Email address, trimmed and lower-cased before storage
    pub email: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    /// Current bearer credential, 64 hex chars (256 bits of randomness).
    /// Exactly one token is valid per account at any time.
    pub session_token: String,

    /// Profile-generation task state
    pub task_state: TaskState,

    /// Result of the last completed run; present iff `task_state` is
    /// `Complete`
    pub task_result: Option<String>,

    /// Identity of the in-flight run; present iff `task_state` is `Running`
    pub task_run_id: Option<Uuid>,

    /// When the in-flight run began; the reaper compares this against its
    /// cutoff
    pub task_started_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// Last mutation to the task fields; reported as the completion time
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Normalized email address
    pub email: String,

    /// Argon2id password hash (not the plaintext password)
    pub password_hash: String,

    /// Initial session token, issued once at creation
    pub session_token: String,
}

/// Trims and lower-cases an email address.
///
/// Applied before every store write and lookup so that uniqueness and
/// sign-in matching are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
