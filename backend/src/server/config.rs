//! HTTP server configuration object and helpers.
//!
//! Everything is environment-driven; unset optionals select the in-memory
//! or fixture adapter so the engine runs self-contained in development.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::DEFAULT_MODEL_TIMEOUT;
use crate::domain::leaderboard_service::DEFAULT_MAX_LIMIT;
use crate::outbound::persistence::DbPool;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Default interval between scheduled aggregation runs (one day).
pub const DEFAULT_AGGREGATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) impact_model_url: Option<String>,
    pub(crate) impact_model_timeout: Duration,
    pub(crate) aggregation_interval: Duration,
    pub(crate) leaderboard_max_limit: usize,
}

/// Configuration parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {variable}: {message}")]
    Invalid { variable: String, message: String },
}

impl ConfigError {
    fn invalid(variable: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            variable: variable.to_owned(),
            message: message.into(),
        }
    }
}

fn env_duration_secs(variable: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(variable) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|err| ConfigError::invalid(variable, err.to_string())),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Construct a configuration with defaults for everything optional.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            db_pool: None,
            impact_model_url: None,
            impact_model_timeout: DEFAULT_MODEL_TIMEOUT,
            aggregation_interval: DEFAULT_AGGREGATION_INTERVAL,
            leaderboard_max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Read configuration from the environment.
    ///
    /// Recognised variables: `BIND_ADDR`, `IMPACT_MODEL_URL`,
    /// `IMPACT_MODEL_TIMEOUT_SECS`, `AGGREGATION_INTERVAL_SECS`,
    /// `LEADERBOARD_LIMIT_MAX`. The database pool is attached separately
    /// because building it is async.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned())
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::invalid("BIND_ADDR", err.to_string()))?;

        let mut config = Self::new(bind_addr);
        config.impact_model_url = std::env::var("IMPACT_MODEL_URL").ok();
        config.impact_model_timeout =
            env_duration_secs("IMPACT_MODEL_TIMEOUT_SECS", DEFAULT_MODEL_TIMEOUT)?;
        config.aggregation_interval =
            env_duration_secs("AGGREGATION_INTERVAL_SECS", DEFAULT_AGGREGATION_INTERVAL)?;
        if let Ok(raw) = std::env::var("LEADERBOARD_LIMIT_MAX") {
            config.leaderboard_max_limit = raw
                .parse::<usize>()
                .map_err(|err| ConfigError::invalid("LEADERBOARD_LIMIT_MAX", err.to_string()))?;
        }
        Ok(config)
    }

    /// Attach a database connection pool for persistence adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Point the weighting adapter at an external impact model.
    #[must_use]
    pub fn with_impact_model_url(mut self, url: impl Into<String>) -> Self {
        self.impact_model_url = Some(url.into());
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_self_contained_adapters() {
        let config = ServerConfig::new(DEFAULT_BIND_ADDR.parse().expect("valid address"));
        assert!(config.db_pool.is_none());
        assert!(config.impact_model_url.is_none());
        assert_eq!(config.leaderboard_max_limit, DEFAULT_MAX_LIMIT);
        assert_eq!(config.aggregation_interval, DEFAULT_AGGREGATION_INTERVAL);
    }
}
