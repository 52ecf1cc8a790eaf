use crate::core::{AppError, Result};
use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_POOL_SIZE: u32 = 5;
const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Connection settings for the MySQL backend.
///
/// `pool_size` is the number of connections kept warm; timeouts are in
/// seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Read `name`, falling back to `default` when unset
fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}: '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

impl DatabaseConfig {
    /// Settings for `url` with the default pool sizing and timeouts
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: DEFAULT_POOL_SIZE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_lifetime_secs: DEFAULT_MAX_LIFETIME_SECS,
        }
    }

    pub fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Configuration("DATABASE_URL not set".to_string()))?;

        Ok(DatabaseConfig {
            url,
            pool_size: env_or("DATABASE_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            acquire_timeout_secs: env_or(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: env_or("DATABASE_MAX_LIFETIME_SECS", DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(AppError::Configuration(
                "DATABASE_MAX_CONNECTIONS must be greater than 0".to_string(),
            ));
        }

        if self.pool_size > self.max_connections {
            return Err(AppError::Configuration(format!(
                "DATABASE_POOL_SIZE ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                self.pool_size, self.max_connections
            )));
        }

        // a zero acquire timeout fails every checkout immediately
        if self.acquire_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.max_lifetime_secs > 0 && self.idle_timeout_secs > self.max_lifetime_secs {
            return Err(AppError::Configuration(format!(
                "DATABASE_IDLE_TIMEOUT_SECS ({}) exceeds DATABASE_MAX_LIFETIME_SECS ({})",
                self.idle_timeout_secs, self.max_lifetime_secs
            )));
        }

        Ok(())
    }

    /// Pool options derived from these settings; a zero idle timeout or
    /// lifetime disables that limit
    pub fn pool_options(&self) -> MySqlPoolOptions {
        let seconds = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(seconds(self.idle_timeout_secs))
            .max_lifetime(seconds(self.max_lifetime_secs))
            .test_before_acquire(true)
    }

    pub async fn create_pool(&self) -> Result<MySqlPool> {
        let pool = self.pool_options().connect(&self.url).await?;

        tracing::info!(
            min = self.pool_size,
            max = self.max_connections,
            acquire_timeout_secs = self.acquire_timeout_secs,
            "Database pool initialized"
        );

        Ok(pool)
    }
}
