/// Profile job queue
///
/// A bounded, typed channel between the request path and the worker pool.
/// `try_start` winners enqueue exactly one job; the send never blocks the
/// request handler. If the queue is full or the pool is gone the job is
/// dropped with an error; the account is then in `Running` with no live
/// worker, which the reaper recovers within its timeout window.
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One accepted profile-generation run, addressed to the worker pool.
///
/// Carries the run identity so the worker's terminal writes can be
/// conditioned on still owning the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileJob {
    /// Account the run belongs to
    pub account_id: Uuid,

    /// Identity of the run that won `try_start`
    pub run_id: Uuid,
}

/// Queue error
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue is at capacity.
    #[error("profile job queue is full")]
    Full,

    /// The worker pool has shut down.
    #[error("profile job queue is closed")]
    Closed,
}

/// Sending half of the job queue, held by the API server.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::Sender<ProfileJob>,
}

impl JobSender {
    /// Enqueues a job without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] or [`QueueError::Closed`]; either way
    /// the caller should log and rely on the reaper to free the account.
    pub fn try_enqueue(&self, job: ProfileJob) -> Result<(), QueueError> {
        self.tx.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

/// Creates a bounded job queue.
///
/// The receiver goes to [`ProfileWorker::run`]; the sender is cloned into
/// the API state.
///
/// [`ProfileWorker::run`]: crate::worker::ProfileWorker::run
pub fn job_channel(capacity: usize) -> (JobSender, mpsc::Receiver<ProfileJob>) {
    let (tx, rx) = mpsc::channel(capacity);
    (JobSender { tx }, rx)
}
