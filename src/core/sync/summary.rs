//! Sync summary and reporting
//!
//! A [`SyncSummary`] is built up while a run iterates and is only ever
//! logged or printed; nothing about a run is persisted.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Which upload an item error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Composition,
    BloodPressure,
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadKind::Composition => f.write_str("body composition"),
            UploadKind::BloodPressure => f.write_str("blood pressure"),
        }
    }
}

/// A rejected upload
#[derive(Debug, Clone)]
pub struct SyncError {
    pub kind: UploadKind,

    /// Reading time of the affected group
    pub group_timestamp: DateTime<Utc>,

    pub message: String,
}

impl SyncError {
    pub fn new(kind: UploadKind, group_timestamp: DateTime<Utc>, message: String) -> Self {
        Self {
            kind,
            group_timestamp,
            message,
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} upload for {} failed: {}",
            self.kind,
            self.group_timestamp.to_rfc3339(),
            self.message
        )
    }
}

/// Result of one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// At least one upload succeeded
    Success,
    /// Every attempted upload failed
    Failure,
    /// Nothing to upload
    Skipped,
}

/// Summary of a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    /// Groups left after filtering
    pub total_groups: usize,

    /// Groups dropped by the validity filter
    pub filtered_out: usize,

    pub processed: usize,

    pub successful: usize,

    pub failed: usize,

    pub skipped: usize,

    /// Cached height used for BMI, if any
    pub height: Option<f64>,

    pub dry_run: bool,

    /// Stopped early by a shutdown signal
    pub interrupted: bool,

    pub duration: Duration,

    pub errors: Vec<SyncError>,

    /// Human-readable per-group log
    pub log: Vec<String>,
}

impl SyncSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Counts one group outcome
    pub fn record(&mut self, outcome: GroupOutcome) {
        self.processed += 1;
        match outcome {
            GroupOutcome::Success => self.successful += 1,
            GroupOutcome::Failure => self.failed += 1,
            GroupOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn add_error(&mut self, error: SyncError) {
        self.errors.push(error);
    }

    /// Appends a line to the run log
    pub fn note(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    /// No failures and not interrupted
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }

    /// Success rate over processed groups, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.successful + self.failed;
        if attempted == 0 {
            return 100.0;
        }
        (self.successful as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total_groups = self.total_groups,
            filtered_out = self.filtered_out,
            processed = self.processed,
            successful = self.successful,
            failed = self.failed,
            skipped = self.skipped,
            interrupted = self.interrupted,
            dry_run = self.dry_run,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Sync summary"
        );

        for error in &self.errors {
            tracing::warn!(
                kind = %error.kind,
                group_timestamp = %error.group_timestamp.to_rfc3339(),
                message = %error.message,
                "Upload error"
            );
        }
    }
}
