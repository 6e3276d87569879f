use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const COMMAND_LOG_FILE: &str = "commands.log";

/// Keeps the background log writer alive. Dropping it flushes pending lines.
/// Empty when another subscriber was already installed.
pub struct LoggingGuard {
    worker: Option<WorkerGuard>,
}

impl LoggingGuard {
    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }
}

/// Installs the global subscriber writing to a daily rolling file in `logs_dir`.
/// If a global subscriber is already set it is kept and the returned guard is
/// inactive.
pub fn init_logging(logs_dir: &Path) -> Result<LoggingGuard, InfraError> {
    fs::create_dir_all(logs_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, COMMAND_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .try_init();
    if let Err(error) = installed {
        tracing::debug!(error = %error, "log subscriber already installed");
        return Ok(LoggingGuard { worker: None });
    }

    tracing::info!(logs_dir = %logs_dir.display(), "logging initialized");
    Ok(LoggingGuard {
        worker: Some(guard),
    })
}
