//! Service configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use fleetdesk_db::DbConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default tracing filter when neither `RUST_LOG` nor `FLEETDESK_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,fleetdesk=debug,sqlx=warn";

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Upper bound on every facade operation, transaction included
    pub request_timeout: Duration,

    /// How long a writer waits for the SQLite write lock
    pub busy_timeout: Duration,

    /// tracing-subscriber filter directives
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            database_path: PathBuf::from("./fleetdesk.db"),
            max_connections: 5,
            request_timeout: Duration::from_millis(10_000),
            busy_timeout: Duration::from_millis(5_000),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                       | Default                          |
    /// |--------------------------------|----------------------------------|
    /// | `FLEETDESK_DATABASE_PATH`      | `./fleetdesk.db`                 |
    /// | `FLEETDESK_MAX_CONNECTIONS`    | `5`                              |
    /// | `FLEETDESK_REQUEST_TIMEOUT_MS` | `10000`                          |
    /// | `FLEETDESK_BUSY_TIMEOUT_MS`    | `5000`                           |
    /// | `FLEETDESK_LOG`                | `info,fleetdesk=debug,sqlx=warn` |
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServiceConfig::default();

        let config = ServiceConfig {
            database_path: lookup("FLEETDESK_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "FLEETDESK_MAX_CONNECTIONS", defaults.max_connections)?,

            request_timeout: Duration::from_millis(parse_or(
                &lookup,
                "FLEETDESK_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )?),

            busy_timeout: Duration::from_millis(parse_or(
                &lookup,
                "FLEETDESK_BUSY_TIMEOUT_MS",
                defaults.busy_timeout.as_millis() as u64,
            )?),

            log_filter: lookup("FLEETDESK_LOG").unwrap_or(defaults.log_filter),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("FLEETDESK_MAX_CONNECTIONS".to_string()));
        }
        if config.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("FLEETDESK_REQUEST_TIMEOUT_MS".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(self.busy_timeout)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
