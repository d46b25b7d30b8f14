/// Configuration management for the API server
///
/// Loads configuration from environment variables into a type-safe struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `WORKER_CONCURRENCY`: Concurrent profile runs (default: 4)
/// - `PROFILE_ATTEMPT_TIMEOUT_SECONDS`: Per-attempt limit (default: 30)
/// - `PROFILE_RUN_MAX_AGE_SECONDS`: Reaper deadline (default: 120)
/// - `REAPER_INTERVAL_SECONDS`: Reaper sweep interval (default: 30)
/// - `RUST_LOG`: Log level (default: info)
use std::env;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseSettings,

    /// Worker pool configuration
    pub worker: WorkerSettings,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Worker pool and reaper configuration
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Concurrent profile-generation runs
    pub concurrency: usize,

    /// Wall-clock limit per generation attempt
    pub attempt_timeout: Duration,

    /// Age past which a running account is considered stuck
    pub run_max_age: Duration,

    /// Reaper sweep interval
    pub reaper_interval: Duration,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()).parse()?)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or any variable has an
    /// unparseable value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_parse("API_PORT", "8080")?,
            },
            database: DatabaseSettings {
                url: database_url,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            worker: WorkerSettings {
                concurrency: env_parse("WORKER_CONCURRENCY", "4")?,
                attempt_timeout: Duration::from_secs(env_parse(
                    "PROFILE_ATTEMPT_TIMEOUT_SECONDS",
                    "30",
                )?),
                run_max_age: Duration::from_secs(env_parse("PROFILE_RUN_MAX_AGE_SECONDS", "120")?),
                reaper_interval: Duration::from_secs(env_parse("REAPER_INTERVAL_SECONDS", "30")?),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
