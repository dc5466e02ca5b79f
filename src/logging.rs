//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! The library only emits `tracing` events; embedding applications pick one
//! of two subscribers:
//! - **File** ([`init_file`]): JSON file layer (daily rotation) + console layer
//! - **Console** ([`init_console`]): stderr only
//!
//! `RUST_LOG` takes precedence over [`LoggingConfig::level`].

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Holds the non-blocking writer guard for file logging.
///
/// The [`WorkerGuard`] must be kept alive for the duration of the process.
/// Dropping it flushes pending log entries and closes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Initialise file logging.
///
/// Writes JSON logs to `{logs_dir}/labelgate.log.YYYY-MM-DD` with daily
/// rotation and mirrors human-readable output to stderr.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_file(logs_dir: &Path, config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "labelgate.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Initialise stderr-only logging, as JSON when [`LoggingConfig::json`] is set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_console(config: &LoggingConfig) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))
}

/// Initialise logging as `config` describes: file logging when a directory
/// is configured, console otherwise.
///
/// # Errors
///
/// See [`init_file`] and [`init_console`].
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.dir {
        Some(dir) => init_file(dir, config).map(Some),
        None => init_console(config).map(|()| None),
    }
}
