//! Logging Module
//!
//! Initializes the tracing subscriber for application logs: a compact console
//! layer always, plus a daily-rotated file layer when a log directory is
//! configured.

use crate::config::LoggingConfig;
use crate::{ProxyError, Result};
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system from the resolved configuration.
///
/// Safe to call more than once; a subscriber that is already installed
/// (typically in tests) is left in place.
pub fn init(config: &LoggingConfig) -> Result<()> {
    // Configured level is the fallback; RUST_LOG always wins
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
        .compact();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                ProxyError::IoError(format!("Failed to create log directory: {}", e))
            })?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "caching-proxy.log");
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                    .compact(),
            )
        }
        None => None,
    };

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    match result {
        Ok(()) => {
            info!("Logging initialized (level: {})", config.log_level);
            if let Some(dir) = &config.log_dir {
                info!("Application logs will be written to {:?}", dir);
            }
        }
        Err(_) => {
            // Already initialized, likely in tests
            debug!("Tracing subscriber already initialized, skipping");
        }
    }

    Ok(())
}
