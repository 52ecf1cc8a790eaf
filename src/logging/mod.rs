pub mod injector;

pub use injector::{LoggerAware, LoggerInjector, LoggerSlot, ScopedLogger};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, LogFormat};
use crate::core::{AppError, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Fails if a subscriber is
/// already installed.
pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("restnucleus={}", config.log_level)))
        .map_err(|e| AppError::Configuration(format!("Invalid LOG_LEVEL: {}", e)))?;

    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .try_init()
        .map_err(|e| AppError::Configuration(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(env = %config.env, format = ?config.log_format, "Tracing initialized");

    Ok(())
}
