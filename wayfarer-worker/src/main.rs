//! # Wayfarer Reaper
//!
//! Standalone recovery process. The API serves generation runs with its own
//! in-process worker pool; this binary exists so that runs orphaned by an API
//! crash are still returned to idle even while no API instance is up.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p wayfarer-worker
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayfarer_shared::profile::ProfileMachine;
use wayfarer_shared::store::{create_pool, run_migrations, DatabaseConfig, PostgresAccountStore};
use wayfarer_worker::reaper::{Reaper, DEFAULT_MAX_RUN_AGE, DEFAULT_SWEEP_INTERVAL};

fn env_duration_seconds(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Wayfarer Reaper v{} starting...", wayfarer_worker::VERSION);

    let database = DatabaseConfig {
        url: std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
        ..DatabaseConfig::default()
    };
    let pool = create_pool(database).await?;
    run_migrations(&pool).await?;

    let machine = ProfileMachine::new(Arc::new(PostgresAccountStore::new(pool)));
    let reaper = Reaper::new(
        machine,
        env_duration_seconds("REAPER_INTERVAL_SECONDS", DEFAULT_SWEEP_INTERVAL),
        env_duration_seconds("PROFILE_RUN_MAX_AGE_SECONDS", DEFAULT_MAX_RUN_AGE),
    );

    let shutdown = CancellationToken::new();
    let reaper_handle = tokio::spawn(reaper.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting...");
    shutdown.cancel();
    reaper_handle.await?;

    Ok(())
}
