//! Logging setup
//!
//! Logs go to a daily-rotated `worklog.log` under the state directory so the
//! terminal only shows command output.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

const LOG_FILE: &str = "worklog.log";

/// Keeps the background writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

pub fn init(config: &LoggingConfig, log_dir: &Path) -> std::io::Result<LoggingGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), level = %config.level, "logging initialized");

    Ok(LoggingGuard { _guard: guard })
}

/// Logs to the test harness output; safe to call from every test.
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
