//! Structured logging setup using tracing
//!
//! Console output is always on. When local logging is enabled, JSON lines are
//! also written to a rolling `hydrosync.log` through a non-blocking writer.
//! Rolled files beyond `local_max_size_mb` are pruned oldest first at startup.

use crate::config::LoggingConfig;
use crate::domain::{HydroError, Result};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File name prefix of the rolling log
pub const LOG_FILE_NAME: &str = "hydrosync.log";

/// Guard that must be kept alive for the duration of the program
/// to ensure logs are flushed properly
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            _file_guard: file_guard,
        }
    }
}

/// Initialize the logging system based on configuration
///
/// # Arguments
///
/// * `log_level_str` - Log level as a string (trace, debug, info, warn, error)
/// * `config` - Logging configuration
///
/// # Returns
///
/// A `LoggingGuard` that must be kept alive for the duration of the program
///
/// # Errors
///
/// Returns a configuration error for an unknown level or an uncreatable
/// log directory.
pub fn init_logging(log_level_str: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_level = parse_log_level(log_level_str)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hydrosync={log_level}")));

    let mut layers = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter.clone());
    layers.push(console_layer.boxed());

    let mut pruned = 0;
    let file_guard = if config.local_enabled {
        let rotation = parse_rotation(&config.local_rotation);

        std::fs::create_dir_all(&config.local_path).map_err(|e| {
            HydroError::Configuration(format!(
                "Failed to create log directory {}: {}",
                config.local_path, e
            ))
        })?;

        let max_bytes = (config.local_max_size_mb as u64).saturating_mul(1024 * 1024);
        pruned = prune_rotated_logs(Path::new(&config.local_path), max_bytes)?;

        let file_appender = RollingFileAppender::new(rotation, &config.local_path, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(non_blocking)
            .with_filter(env_filter);

        layers.push(file_layer.boxed());
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| HydroError::Configuration(format!("Failed to install subscriber: {e}")))?;

    tracing::info!(
        local_enabled = config.local_enabled,
        local_path = %config.local_path,
        pruned_files = pruned,
        "Logging initialized"
    );

    Ok(LoggingGuard::new(file_guard))
}

/// Removes the oldest rolled log files until the rest fit in `max_bytes`
///
/// Rolled files carry a sortable date suffix, so name order is age order.
/// The newest file is never removed. Returns the number of files removed.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be listed or a file cannot
/// be removed.
pub fn prune_rotated_logs(dir: &Path, max_bytes: u64) -> Result<usize> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(LOG_FILE_NAME) {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            files.push((name, entry.path(), metadata.len()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut total: u64 = files.iter().map(|(_, _, len)| len).sum();
    let mut removed = 0;
    let candidates = files.len().saturating_sub(1);

    for (_, path, len) in files.into_iter().take(candidates) {
        if total <= max_bytes {
            break;
        }
        std::fs::remove_file(&path)?;
        total -= len;
        removed += 1;
    }

    Ok(removed)
}

fn parse_rotation(value: &str) -> Rotation {
    match value {
        "hourly" => Rotation::HOURLY,
        _ => Rotation::DAILY,
    }
}

/// Parse log level from string
fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(HydroError::Configuration(format!(
            "Invalid log level: {level_str}. Must be one of: trace, debug, info, warn, error"
        ))),
    }
}
