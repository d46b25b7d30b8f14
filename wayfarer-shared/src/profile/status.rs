/// Status projection
///
/// Renders the persisted account row into the status value polling clients
/// see. The authoritative `task_state` column drives the projection; result
/// payload presence alone never does, so a stale result can never be
/// conflated with a run that is currently in flight. There is deliberately
/// no secondary cache to consult: the store is the single source of truth.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Account, TaskState};

/// Client-facing profile-generation status.
///
/// Serializes to the wire shape polled by clients:
/// `{"status":"idle"}`, `{"status":"running","startedAt":...}` or
/// `{"status":"complete","result":...,"completedAt":...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProfileStatus {
    /// No run has completed and none is in flight
    Idle,

    /// A run is in flight
    Running {
        /// When the run began
        #[serde(rename = "startedAt", skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
    },

    /// The last run finished
    Complete {
        /// The generated traveler type
        result: String,

        /// When the run finished
        #[serde(rename = "completedAt")]
        completed_at: DateTime<Utc>,
    },
}

impl ProfileStatus {
    /// Projects an account row into its client-facing status.
    pub fn project(account: &Account) -> Self {
        match account.task_state {
            TaskState::Idle => ProfileStatus::Idle,
            TaskState::Running => ProfileStatus::Running {
                started_at: account.task_started_at,
            },
            TaskState::Complete => match &account.task_result {
                Some(result) => ProfileStatus::Complete {
                    result: result.clone(),
                    completed_at: account.updated_at,
                },
                // Complete without a result violates the store invariant;
                // report idle rather than invent a payload.
                None => {
                    tracing::warn!(account_id = %account.id, "Complete state with no result");
                    ProfileStatus::Idle
                }
            },
        }
    }
}
