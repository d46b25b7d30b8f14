/// Stale-run reaper
///
/// Periodically returns accounts stuck in `Running` past a deadline to
/// `Idle`. This is the bound on how long a crashed worker, a dropped job, or
/// a killed process can wedge an account. Any lagging completion from the
/// reaped run is rejected by its run identity, so reaping is always safe.
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use wayfarer_shared::profile::ProfileMachine;

/// Default sweep interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Default age past which a running account is considered stuck.
pub const DEFAULT_MAX_RUN_AGE: Duration = Duration::from_secs(120);

/// Background sweeper over the account store.
pub struct Reaper {
    machine: ProfileMachine,
    interval: Duration,
    max_run_age: Duration,
}

impl Reaper {
    /// Creates a reaper sweeping every `interval` for runs older than
    /// `max_run_age`.
    pub fn new(machine: ProfileMachine, interval: Duration, max_run_age: Duration) -> Self {
        Self {
            machine,
            interval,
            max_run_age,
        }
    }

    /// Runs one sweep, returning how many accounts were reset.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the periodic loop logs and keeps going.
    pub async fn sweep(&self) -> Result<u64, wayfarer_shared::profile::MachineError> {
        let reset = self.machine.reap_stale(self.max_run_age).await?;
        if reset > 0 {
            tracing::warn!(reset, "Reset stale profile runs to idle");
        }
        Ok(reset)
    }

    /// Sweeps on the configured interval until shutdown is signalled.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_seconds = self.interval.as_secs(),
            max_run_age_seconds = self.max_run_age.as_secs(),
            "Stale-run reaper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        // First tick fires immediately; skip it so a fresh deploy does not
        // sweep before workers have had a chance to pick up anything.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep().await {
                        tracing::error!(error = %err, "Reaper sweep failed");
                    }
                }
            }
        }

        tracing::info!("Stale-run reaper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;
    use wayfarer_shared::models::NewAccount;
    use wayfarer_shared::profile::{ProfileStatus, StartOutcome};
    use wayfarer_shared::store::{AccountStore, InMemoryAccountStore};

    async fn machine_with_account() -> (ProfileMachine, Uuid) {
        let store = Arc::new(InMemoryAccountStore::new());
        let account = store
            .create_account(NewAccount {
                email: "traveler@example.com".to_string(),
                password_hash: "$argon2id$test".to_string(),
                session_token: "token".to_string(),
            })
            .await
            .unwrap();
        (ProfileMachine::new(store), account.id)
    }

    #[tokio::test]
    async fn test_sweep_resets_stale_run() {
        let (machine, account_id) = machine_with_account().await;
        assert!(matches!(
            machine.try_start(account_id).await.unwrap(),
            StartOutcome::Started(_)
        ));

        let reaper = Reaper::new(machine.clone(), Duration::from_secs(1), Duration::ZERO);
        assert_eq!(reaper.sweep().await.unwrap(), 1);
        assert_eq!(
            machine.status(account_id).await.unwrap(),
            ProfileStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_sweep_leaves_fresh_run_alone() {
        let (machine, account_id) = machine_with_account().await;
        machine.try_start(account_id).await.unwrap();

        let reaper = Reaper::new(
            machine.clone(),
            Duration::from_secs(1),
            Duration::from_secs(3600),
        );
        assert_eq!(reaper.sweep().await.unwrap(), 0);
        assert!(matches!(
            machine.status(account_id).await.unwrap(),
            ProfileStatus::Running { .. }
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (machine, _) = machine_with_account().await;
        let reaper = Reaper::new(machine, Duration::from_secs(3600), Duration::ZERO);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(reaper.run(shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper did not stop")
            .unwrap();
    }
}
