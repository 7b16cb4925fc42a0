//! Logging and observability
//!
//! Structured logging through `tracing`, with an optional rolling JSON file
//! log. The macros below keep field names consistent across the sync path.
//!
//! # Example
//!
//! ```no_run
//! use weighbridge::config::LoggingConfig;
//! use weighbridge::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a sync run
///
/// # Example
///
/// ```no_run
/// use weighbridge::log_sync_start;
///
/// log_sync_start!("connect", "2024-01-01T00:00:00Z", "now", "real");
/// ```
#[macro_export]
macro_rules! log_sync_start {
    ($destination:expr, $start:expr, $end:expr, $category:expr) => {
        tracing::info!(
            destination = %$destination,
            window_start = %$start,
            window_end = %$end,
            category = %$category,
            "Starting sync run"
        );
    };
}

/// Log the completion of a sync run
///
/// # Example
///
/// ```no_run
/// use weighbridge::log_sync_complete;
/// use std::time::Duration;
///
/// log_sync_complete!(12, 1, Duration::from_secs(14));
/// ```
#[macro_export]
macro_rules! log_sync_complete {
    ($successful:expr, $failed:expr, $duration:expr) => {
        tracing::info!(
            successful = $successful,
            failed = $failed,
            duration_ms = $duration.as_millis() as u64,
            "Sync run completed"
        );
    };
}

/// Log per-group progress
#[macro_export]
macro_rules! log_group_progress {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / ($total as f64).max(1.0) * 100.0),
            "Processed measurement group"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use weighbridge::domain::BridgeError;
/// use weighbridge::log_error_with_context;
///
/// let error = BridgeError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
