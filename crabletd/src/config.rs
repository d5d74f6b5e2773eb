//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use crablet_outbox::LockStrategy;
use std::env;
use std::time::Duration;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Required outside `Environment::Test`.
    pub database_url: Option<String>,

    /// Outbox processing cycle configuration.
    pub outbox: OutboxConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Outbox processing cycle configuration.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// How often the daemon drives a processing cycle over all bound pairs.
    pub poll_interval: Duration,
    /// Max events published per pair per cycle.
    pub batch_size: u64,
    /// Consecutive failures before a pair auto-pauses to `FAILED`.
    pub max_retries: u32,
    /// Leader election granularity across daemon instances.
    pub lock_strategy: LockStrategy,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (in-memory store, no leader election).
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let database_url = env::var("DATABASE_URL").ok();
        let outbox = Self::load_outbox_config()?;

        Ok(Self { database_url, outbox, environment })
    }

    /// Create test configuration: in-memory, fast poll, no database.
    pub fn test() -> Self {
        Self {
            database_url: None,
            outbox: OutboxConfig {
                poll_interval: Duration::from_millis(50),
                batch_size: 100,
                max_retries: 3,
                lock_strategy: LockStrategy::Global,
            },
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("CRABLET_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid CRABLET_ENV: {other}. Expected: test, development, production"
            ))),
        }
    }

    fn load_outbox_config() -> DaemonResult<OutboxConfig> {
        let poll_interval_ms = Self::load_u64_env("CRABLET_OUTBOX_POLL_INTERVAL_MS", 1000)?;
        let batch_size = Self::load_u64_env("CRABLET_OUTBOX_BATCH_SIZE", 100)?;
        let max_retries = Self::load_u64_env("CRABLET_OUTBOX_MAX_RETRIES", 5)? as u32;
        let lock_strategy = match env::var("CRABLET_OUTBOX_LOCK_STRATEGY") {
            Ok(s) if s.eq_ignore_ascii_case("per-topic-publisher") => LockStrategy::PerTopicPublisher,
            Ok(s) if s.eq_ignore_ascii_case("global") => LockStrategy::Global,
            Ok(other) => {
                return Err(DaemonError::Config(format!(
                    "Invalid CRABLET_OUTBOX_LOCK_STRATEGY: {other}. Expected: global, per-topic-publisher"
                )))
            }
            Err(_) => LockStrategy::Global,
        };

        Ok(OutboxConfig {
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size,
            max_retries,
            lock_strategy,
        })
    }

    fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
        match env::var(key) {
            Ok(val) => val.parse().map_err(|_| DaemonError::Config(format!("Invalid {key} value: {val}"))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            outbox: OutboxConfig {
                poll_interval: Duration::from_millis(1000),
                batch_size: 100,
                max_retries: 5,
                lock_strategy: LockStrategy::Global,
            },
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.outbox.batch_size, 100);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert!(config.database_url.is_none());
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
