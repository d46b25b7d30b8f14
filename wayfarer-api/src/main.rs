//! # Wayfarer API Server
//!
//! HTTP server for accounts, sessions, and traveler-profile generation.
//!
//! ## Architecture
//!
//! One process hosts three cooperating pieces over a shared Postgres store:
//! - the Axum HTTP surface (signup, signin, signout, task trigger, status)
//! - the in-process worker pool consuming the profile job queue
//! - the stale-run reaper
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p wayfarer-api
//! ```

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayfarer_api::app::{build_router, AppState};
use wayfarer_api::config::Config;
use wayfarer_shared::store::{create_pool, run_migrations, DatabaseConfig, PostgresAccountStore};
use wayfarer_worker::generator::SimulatedProfileApi;
use wayfarer_worker::queue::{job_channel, DEFAULT_QUEUE_CAPACITY};
use wayfarer_worker::reaper::Reaper;
use wayfarer_worker::worker::{ProfileWorker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Wayfarer API Server v{} starting...", wayfarer_api::VERSION);

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..DatabaseConfig::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let store = Arc::new(PostgresAccountStore::new(pool));
    let (jobs, job_rx) = job_channel(DEFAULT_QUEUE_CAPACITY);
    let state = AppState::new(store, jobs);

    // Worker pool and reaper share the API's state machine and shut down
    // with the server.
    let shutdown = CancellationToken::new();
    let worker = ProfileWorker::new(
        state.machine.clone(),
        Arc::new(SimulatedProfileApi::new()),
        WorkerConfig {
            concurrency: config.worker.concurrency,
            attempt_timeout: config.worker.attempt_timeout,
            ..WorkerConfig::default()
        },
    );
    let worker_handle = tokio::spawn(worker.run(job_rx, shutdown.clone()));

    let reaper = Reaper::new(
        state.machine.clone(),
        config.worker.reaper_interval,
        config.worker.run_max_age,
    );
    let reaper_handle = tokio::spawn(reaper.run(shutdown.clone()));

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, exiting...");
        })
        .await?;

    shutdown.cancel();
    worker_handle.await?;
    reaper_handle.await?;

    Ok(())
}
