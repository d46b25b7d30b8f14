/// Profile generation
///
/// The call that actually produces a traveler profile. In production this
/// would front an external classification service; here it is simulated with
/// a randomized delay and a random traveler type, which is enough to exercise
/// every orchestration path the system cares about.
use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// The closed set of traveler types a run can produce.
pub const TRAVELER_TYPES: [&str; 8] = [
    "adventurer",
    "explorer",
    "nomad",
    "pioneer",
    "wanderer",
    "voyager",
    "backpacker",
    "globetrotter",
];

/// Generation failure.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The upstream call failed; the attempt may be retried.
    #[error("profile generation failed: {0}")]
    Upstream(String),
}

/// A source of traveler profiles.
///
/// Implementations must be cancel-safe: the worker wraps every call in a
/// timeout and may drop the future mid-flight.
#[async_trait]
pub trait ProfileGenerator: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Produces a traveler type for the account.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Upstream`] when the profile could not be
    /// produced.
    async fn generate(&self, account_id: Uuid) -> Result<String, GeneratorError>;
}

/// Simulated external profile service.
///
/// Sleeps a random duration inside the configured range, then picks a
/// traveler type uniformly at random.
pub struct SimulatedProfileApi {
    delay_seconds: RangeInclusive<u64>,
}

impl SimulatedProfileApi {
    /// Creates the simulator with the default 3 to 6 second delay.
    pub fn new() -> Self {
        Self::with_delay(3..=6)
    }

    /// Creates the simulator with a custom delay range in seconds.
    pub fn with_delay(delay_seconds: RangeInclusive<u64>) -> Self {
        Self { delay_seconds }
    }
}

impl Default for SimulatedProfileApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileGenerator for SimulatedProfileApi {
    fn name(&self) -> &str {
        "simulated-profile-api"
    }

    async fn generate(&self, account_id: Uuid) -> Result<String, GeneratorError> {
        // Draw both random values before the await so the future stays Send.
        let (delay, profile) = {
            let mut rng = rand::thread_rng();
            let delay = rng.gen_range(self.delay_seconds.clone());
            let profile = TRAVELER_TYPES[rng.gen_range(0..TRAVELER_TYPES.len())];
            (delay, profile)
        };

        tracing::debug!(%account_id, delay_seconds = delay, "Simulating profile generation");
        tokio::time::sleep(Duration::from_secs(delay)).await;

        Ok(profile.to_string())
    }
}

/// Deterministic generator for tests: completes immediately with a fixed
/// profile, or fails a configured number of times first.
pub struct FixedProfile {
    profile: String,
    failures_before_success: std::sync::atomic::AtomicU32,
}

impl FixedProfile {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            failures_before_success: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Fails the first `count` calls before succeeding.
    pub fn failing_first(profile: impl Into<String>, count: u32) -> Self {
        Self {
            profile: profile.into(),
            failures_before_success: std::sync::atomic::AtomicU32::new(count),
        }
    }
}

#[async_trait]
impl ProfileGenerator for FixedProfile {
    fn name(&self) -> &str {
        "fixed-profile"
    }

    async fn generate(&self, _account_id: Uuid) -> Result<String, GeneratorError> {
        use std::sync::atomic::Ordering;

        let remaining = self.failures_before_success.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_before_success
                .store(remaining - 1, Ordering::SeqCst);
            return Err(GeneratorError::Upstream("injected failure".to_string()));
        }
        Ok(self.profile.clone())
    }
}
