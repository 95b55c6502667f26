//! Tracing subscriber setup.
//!
//! Filter resolution order:
//! 1. TEAMSITE_LOG environment variable (if set and valid)
//! 2. `[log] level` from config

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogConfig, paths};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "TEAMSITE_LOG";

const LOG_FILE_NAME: &str = "teamsite.log";

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config.level.trim()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes the global subscriber.
///
/// With `file = true`, logs go to `<home>/logs/teamsite.log` through a
/// non-blocking writer; the returned guard must be held until exit so the
/// buffer is flushed. Otherwise logs go to stderr and no guard is returned.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    init_in(config, &paths::logs_dir())
}

/// Same as [`init`], with an explicit log directory.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_in(config: &LogConfig, logs_dir: &Path) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config);

    if config.file {
        fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
        let appender = tracing_appender::rolling::never(logs_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(writer),
            )
            .try_init()
            .context("Failed to install tracing subscriber")?;

        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(io::stderr),
            )
            .try_init()
            .context("Failed to install tracing subscriber")?;

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back_to_info() {
        let config = LogConfig {
            level: "teamsite=loud".to_string(),
            file: false,
        };
        assert_eq!(build_filter(&config).to_string(), "info");
    }
}
