//! Logging bootstrap.

use anyhow::{Result, anyhow};
use portal_core::config::LogSettings;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps the file writer flushing; drop it only at shutdown.
pub type LogGuard = WorkerGuard;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `settings.level`. When file logging is enabled a
/// daily-rotated `portal.log` is written under `logs_dir`; keep the returned
/// guard alive for the lifetime of the process so buffered lines are flushed.
pub fn init_logging(settings: &LogSettings, logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", settings.level, e))?;

    let console = fmt::layer().with_target(false);

    match logs_dir.filter(|_| settings.file) {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", dir, e))?;
            let appender = tracing_appender::rolling::daily(dir, "portal.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()
                .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

            Ok(None)
        }
    }
}
