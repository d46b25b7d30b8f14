/// Worker pool
///
/// Consumes profile jobs from the queue and drives each run to a terminal
/// state. The pool never decides who owns a run: every terminal write goes
/// through the state machine carrying the job's run identity, so a worker
/// that outlived its run writes nothing.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use wayfarer_shared::profile::{CompleteOutcome, ProfileMachine, RunTicket};

use crate::generator::ProfileGenerator;
use crate::queue::ProfileJob;

/// Worker pool tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of runs in flight at once
    pub concurrency: usize,

    /// Attempts per run before giving up
    pub max_attempts: u32,

    /// Wall-clock limit for a single generation attempt
    pub attempt_timeout: Duration,

    /// Pause between failed attempts
    pub retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Pool of profile-generation workers over one job queue.
pub struct ProfileWorker {
    machine: ProfileMachine,
    generator: Arc<dyn ProfileGenerator>,
    config: WorkerConfig,
}

impl ProfileWorker {
    /// Creates a pool over the given state machine and generator.
    pub fn new(
        machine: ProfileMachine,
        generator: Arc<dyn ProfileGenerator>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            machine,
            generator,
            config,
        }
    }

    /// Consumes jobs until the queue closes or shutdown is signalled, then
    /// drains in-flight runs before returning.
    pub async fn run(self, mut jobs: mpsc::Receiver<ProfileJob>, shutdown: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        tracing::info!(
            generator = self.generator.name(),
            concurrency = self.config.concurrency,
            "Profile worker pool started"
        );

        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let machine = self.machine.clone();
            let generator = Arc::clone(&self.generator);
            let config = self.config.clone();
            tokio::spawn(async move {
                process_job(&machine, generator.as_ref(), &config, job).await;
                drop(permit);
            });
        }

        // Wait for in-flight runs; their state writes must land before exit.
        let _ = permits
            .acquire_many(self.config.concurrency as u32)
            .await;
        tracing::info!("Profile worker pool stopped");
    }
}

/// Drives one job to a terminal state.
async fn process_job(
    machine: &ProfileMachine,
    generator: &dyn ProfileGenerator,
    config: &WorkerConfig,
    job: ProfileJob,
) {
    let ticket = RunTicket {
        account_id: job.account_id,
        run_id: job.run_id,
    };

    for attempt in 1..=config.max_attempts {
        match tokio::time::timeout(config.attempt_timeout, generator.generate(job.account_id))
            .await
        {
            Ok(Ok(profile)) => {
                match machine.complete(&ticket, &profile).await {
                    Ok(CompleteOutcome::Recorded | CompleteOutcome::StaleRun) => {}
                    Err(err) => {
                        tracing::error!(
                            account_id = %job.account_id,
                            run_id = %job.run_id,
                            error = %err,
                            "Failed to record profile run result"
                        );
                    }
                }
                return;
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    account_id = %job.account_id,
                    run_id = %job.run_id,
                    attempt,
                    error = %err,
                    "Profile generation attempt failed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    account_id = %job.account_id,
                    run_id = %job.run_id,
                    attempt,
                    timeout_seconds = config.attempt_timeout.as_secs(),
                    "Profile generation attempt timed out"
                );
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.retry_delay).await;
        }
    }

    // Exhausted: hand the account back to idle so it can be retriggered.
    if let Err(err) = machine.abandon(&ticket).await {
        tracing::error!(
            account_id = %job.account_id,
            run_id = %job.run_id,
            error = %err,
            "Failed to abandon exhausted profile run"
        );
    }
}
