use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CREW_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// `<data_local_dir>/crew-assistant/logs`
pub fn log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("crew-assistant").join("logs"))
}

/// The terminal belongs to the UI, so the interactive app logs to a daily
/// file. Keep the guard alive until exit or buffered lines are lost.
pub fn init_file_logging() -> Result<WorkerGuard> {
    let dir = log_dir().ok_or_else(|| anyhow!("Could not determine log directory"))?;
    std::fs::create_dir_all(&dir)?;

    let appender = tracing_appender::rolling::daily(&dir, "crew-assistant.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}

/// Headless commands log to stderr, warnings and above unless overridden.
pub fn init_stderr_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
