/// Traveler-profile task endpoints
///
/// # Endpoints
///
/// - `POST /task/generate` - Trigger a profile-generation run
/// - `GET /task/status` - Poll the current run status
///
/// The trigger is decided entirely by the state machine's atomic guard; this
/// handler never reads state and then writes it. Winning the guard and
/// queueing the job are the only two steps on the request path, and the
/// generation itself happens on the worker pool after the 202 is sent.
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};

use wayfarer_shared::auth::middleware::AuthSession;
use wayfarer_shared::profile::{ProfileStatus, StartOutcome};
use wayfarer_worker::queue::ProfileJob;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Trigger a profile-generation run
///
/// # Responses
///
/// - `202 Accepted`: this call won the trigger; a run is now in flight
/// - `409 Conflict`: a run was already in flight; nothing was scheduled
pub async fn generate(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let ticket = match state.machine.try_start(session.account_id).await? {
        StartOutcome::Started(ticket) => ticket,
        StartOutcome::AlreadyRunning => {
            return Err(ApiError::Conflict(
                "Profile generation already in progress".to_string(),
            ));
        }
    };

    if let Err(err) = state.jobs.try_enqueue(ProfileJob {
        account_id: ticket.account_id,
        run_id: ticket.run_id,
    }) {
        // The account stays Running with no live worker until the reaper
        // returns it to idle; the trigger itself already succeeded.
        tracing::error!(
            account_id = %ticket.account_id,
            run_id = %ticket.run_id,
            error = %err,
            "Failed to queue profile job"
        );
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "running" }))))
}

/// Poll the current run status
///
/// Projects the authoritative store row; repeated polls with no intervening
/// trigger never regress from `complete` to anything else.
pub async fn status(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ProfileStatus>> {
    Ok(Json(state.machine.status(session.account_id).await?))
}
