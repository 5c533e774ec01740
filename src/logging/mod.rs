//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs with daily or hourly rotation and a size cap
//! - Configurable log levels, overridable through `RUST_LOG`
//! - Console output for interactive runs
//!
//! # Example
//!
//! ```no_run
//! use hydrosync::logging::init_logging;
//! use hydrosync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, prune_rotated_logs, LoggingGuard, LOG_FILE_NAME};

/// Log the start of an export
///
/// # Example
///
/// ```no_run
/// use hydrosync::log_export_start;
/// use hydrosync::domain::ResultId;
///
/// let result_id = ResultId::new("run_2024_01").unwrap();
/// log_export_start!(&result_id, "database");
/// ```
#[macro_export]
macro_rules! log_export_start {
    ($result_id:expr, $target:expr) => {
        tracing::info!(
            result_id = %$result_id,
            target = %$target,
            "Starting export"
        );
    };
}

/// Log the completion of an export
///
/// # Example
///
/// ```no_run
/// use hydrosync::log_export_complete;
/// use std::time::Duration;
///
/// log_export_complete!("run_2024_01", true, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_export_complete {
    ($result_id:expr, $success:expr, $duration:expr) => {
        tracing::info!(
            result_id = %$result_id,
            success = $success,
            duration_ms = $duration.as_millis() as u64,
            "Export completed"
        );
    };
}

/// Log the failure of one relational export step
///
/// # Example
///
/// ```no_run
/// use hydrosync::log_step_failure;
///
/// log_step_failure!("purge", "run_2024_01", "relation \"rpt_node\" does not exist");
/// ```
#[macro_export]
macro_rules! log_step_failure {
    ($step:expr, $result_id:expr, $error:expr) => {
        tracing::error!(
            step = $step,
            result_id = %$result_id,
            error = %$error,
            "Export step failed"
        );
    };
}

/// Log a batch processing operation
///
/// # Example
///
/// ```no_run
/// use hydrosync::log_batch_processing;
///
/// log_batch_processing!(3, 12);
/// ```
#[macro_export]
macro_rules! log_batch_processing {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Processing batch"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use hydrosync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    #[test]
    fn test_macros_expand_without_subscriber() {
        crate::log_export_start!("run_1", "frost");
        crate::log_export_complete!("run_1", false, Duration::from_millis(15));
        crate::log_step_failure!("purge", "run_1", "boom");
        crate::log_batch_processing!(1, 4);
        crate::log_retry_attempt!(1, 3, "HTTP 503");
    }
}
