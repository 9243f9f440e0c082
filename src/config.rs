use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// JSON file backing the key-value store.
    pub data_file: PathBuf,
    /// Address the dashboard API listens on.
    pub bind_addr: SocketAddr,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// Seconds between sweeps of expired sessions.
    pub session_sweep_interval_secs: u64,
    /// The statistics endpoint polled by the dashboard.
    pub statistics_url: String,
    /// Seconds between statistics polls.
    pub statistics_poll_interval_secs: u64,
    /// Whether to create the default admin account on an empty store.
    pub bootstrap_admin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/sharedash.json"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            session_duration_days: 7,
            session_sweep_interval_secs: 3600,
            statistics_url: "http://127.0.0.1:3000/statistics".to_string(),
            statistics_poll_interval_secs: 3,
            bootstrap_admin: true,
        }
    }
}

fn var_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            data_file: env::var("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            bind_addr: var_or("BIND_ADDR", defaults.bind_addr)?,
            session_duration_days: var_or("SESSION_DURATION_DAYS", defaults.session_duration_days)?,
            session_sweep_interval_secs: var_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.session_sweep_interval_secs,
            )?,
            statistics_url: env::var("STATISTICS_URL").unwrap_or(defaults.statistics_url),
            statistics_poll_interval_secs: var_or(
                "STATISTICS_POLL_INTERVAL_SECS",
                defaults.statistics_poll_interval_secs,
            )?,
            bootstrap_admin: var_or("BOOTSTRAP_ADMIN", defaults.bootstrap_admin)?,
        };

        if config.session_duration_days <= 0 {
            anyhow::bail!("SESSION_DURATION_DAYS must be positive");
        }
        if config.session_sweep_interval_secs == 0 || config.statistics_poll_interval_secs == 0 {
            anyhow::bail!("Intervals must be at least one second");
        }

        Ok(config)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_duration_days)
    }
}
