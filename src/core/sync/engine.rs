//! Historical batch sync and the latest-weighing sync
//!
//! One run: authenticate both sides, fetch the cached height, fetch the
//! window, drop groups with nothing to upload, replay the rest oldest first
//! with a pause between groups. Only authentication and fetch failures end
//! a run early; upload failures are counted per group.

use super::pacing::Pacer;
use super::summary::{GroupOutcome, SyncError, SyncSummary, UploadKind};
use super::window::SyncWindow;
use crate::adapters::destination::{BloodPressureUpload, CompositionUpload, Destination};
use crate::adapters::withings::MeasureQuery;
use crate::config::SyncConfig;
use crate::core::auth::{CodeProvider, SourceAuthenticator};
use crate::domain::{BridgeError, Category, MeasurementGroup, Result};
use crate::{log_group_progress, log_sync_complete, log_sync_start};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{watch, Mutex};

/// Called after each group with `(processed, total)`
pub type ProgressCallback = Box<dyn FnMut(usize, usize) + Send>;

/// Clears the in-flight flag when a run ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sync engine
///
/// # Example
///
/// ```rust,no_run
/// use weighbridge::adapters::destination::DryRunDestination;
/// use weighbridge::adapters::withings::WithingsClient;
/// use weighbridge::config::load_config;
/// use weighbridge::core::auth::{NoInteraction, SourceAuthenticator};
/// use weighbridge::core::state::TokenStore;
/// use weighbridge::core::sync::{SyncEngine, SyncWindow};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config("weighbridge.toml")?;
/// let client = WithingsClient::new(&config.withings)?;
/// let authenticator = SourceAuthenticator::new(
///     client,
///     TokenStore::new(config.token_file_path()),
///     config.withings.oauth_state.clone(),
/// );
/// let engine = SyncEngine::new(
///     config.sync.clone(),
///     authenticator,
///     Box::new(DryRunDestination::new()),
/// );
///
/// let window = SyncWindow::last_days(30, chrono::Utc::now(), config.sync.category)?;
/// let (_tx, shutdown_rx) = tokio::sync::watch::channel(false);
/// let summary = engine.run_batch(&window, None, &NoInteraction, shutdown_rx).await?;
/// println!("Uploaded {} groups", summary.successful);
/// # Ok(())
/// # }
/// ```
pub struct SyncEngine {
    config: SyncConfig,
    authenticator: Mutex<SourceAuthenticator>,
    destination: Mutex<Box<dyn Destination>>,
    in_flight: AtomicBool,
    dry_run: bool,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        authenticator: SourceAuthenticator,
        destination: Box<dyn Destination>,
    ) -> Self {
        Self {
            config,
            authenticator: Mutex::new(authenticator),
            destination: Mutex::new(destination),
            in_flight: AtomicBool::new(false),
            dry_run: false,
        }
    }

    /// Marks summaries as produced by a dry run
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether a run is currently executing
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs one batch over `window`
    ///
    /// # Errors
    ///
    /// - [`BridgeError::SyncInProgress`] when another run is executing
    /// - source or destination authentication failures
    /// - a measurement fetch failure (nothing is uploaded in that case)
    pub async fn run_batch(
        &self,
        window: &SyncWindow,
        progress: Option<ProgressCallback>,
        codes: &dyn CodeProvider,
        shutdown: watch::Receiver<bool>,
    ) -> Result<SyncSummary> {
        let query = MeasureQuery::window(
            self.config.meas_types.clone(),
            window.category,
            window.start,
            window.end,
        );
        let span = RunSpan {
            start: window.start.to_rfc3339(),
            end: window
                .end
                .map(|end| end.to_rfc3339())
                .unwrap_or_else(|| "now".to_string()),
        };
        self.run(query, span, Selection::AllValid, progress, codes, shutdown)
            .await
    }

    /// Uploads only the newest group that carries a weight
    ///
    /// This is the daily scheduled sync: no window, the provider returns
    /// recent history and everything but the latest weighing is ignored.
    ///
    /// # Errors
    ///
    /// Same as [`SyncEngine::run_batch`].
    pub async fn run_latest(
        &self,
        category: Category,
        progress: Option<ProgressCallback>,
        codes: &dyn CodeProvider,
        shutdown: watch::Receiver<bool>,
    ) -> Result<SyncSummary> {
        let query = MeasureQuery::recent(self.config.meas_types.clone(), category);
        let span = RunSpan {
            start: "latest".to_string(),
            end: "now".to_string(),
        };
        self.run(query, span, Selection::LatestWeight, progress, codes, shutdown)
            .await
    }

    async fn run(
        &self,
        query: MeasureQuery,
        span: RunSpan,
        selection: Selection,
        mut progress: Option<ProgressCallback>,
        codes: &dyn CodeProvider,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<SyncSummary> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::SyncInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let started = Instant::now();
        let mut summary = SyncSummary::new();
        summary.dry_run = self.dry_run;

        let mut authenticator = self.authenticator.lock().await;
        let mut destination = self.destination.lock().await;
        log_sync_start!(
            destination.name(),
            span.start,
            span.end,
            format!("{:?}", query.category)
        );

        let token = authenticator.authenticate(codes).await?;
        destination.login().await?;

        let client = authenticator.client();
        let height = client.fetch_height(&token.access_token).await;
        summary.height = height;
        match height {
            Some(h) => summary.note(format!("Using height {h} m for BMI")),
            None => summary.note("No height available, BMI will not be sent"),
        }

        let fetched = client.fetch_measurements(&token.access_token, &query).await?;
        drop(authenticator);

        let groups = match selection {
            Selection::AllValid => prepare_groups(fetched, &mut summary),
            Selection::LatestWeight => latest_weight_group(fetched, &mut summary),
        };
        let total = groups.len();
        summary.total_groups = total;
        summary.note(format!(
            "Found {total} measurement groups to upload ({} filtered out)",
            summary.filtered_out
        ));

        let mut pacer = Pacer::new(self.config.pacing.clone());

        for (index, group) in groups.iter().enumerate() {
            if *shutdown.borrow() {
                tracing::warn!(
                    processed = summary.processed,
                    total,
                    "Shutdown requested, stopping before next group"
                );
                summary.interrupted = true;
                break;
            }

            let outcome = upload_group(&**destination, group, height, &mut summary).await;
            summary.record(outcome);

            if let Some(callback) = progress.as_mut() {
                callback(index + 1, total);
            }
            log_group_progress!(index + 1, total);

            if index + 1 < total {
                tokio::select! {
                    _ = pacer.pause() => {}
                    Ok(()) = shutdown.changed() => {}
                }
            }
        }

        let summary = summary.with_duration(started.elapsed());
        log_sync_complete!(summary.successful, summary.failed, summary.duration);
        summary.log_summary();

        Ok(summary)
    }
}

/// Which fetched groups a run uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    /// Every group with an uploadable metric, oldest first
    AllValid,
    /// Only the newest group with a weight
    LatestWeight,
}

/// Labels for the start-of-run log line
struct RunSpan {
    start: String,
    end: String,
}

/// Keeps the newest group with a usable weight
fn latest_weight_group(groups: Vec<MeasurementGroup>, summary: &mut SyncSummary) -> Vec<MeasurementGroup> {
    let before = groups.len();
    let latest: Vec<MeasurementGroup> = groups
        .into_iter()
        .filter(|group| group.decode().has_weight())
        .max_by_key(|group| group.timestamp)
        .into_iter()
        .collect();
    summary.filtered_out = before - latest.len();
    if latest.is_empty() && before > 0 {
        summary.note("No measurement group with weight found");
    }
    latest
}

/// Filters out groups with nothing to upload and orders the rest oldest first
fn prepare_groups(mut groups: Vec<MeasurementGroup>, summary: &mut SyncSummary) -> Vec<MeasurementGroup> {
    let before = groups.len();
    groups.retain(|group| group.decode().is_valid());
    summary.filtered_out = before - groups.len();

    // Provider order is newest first; reversing keeps ties in replay order
    groups.reverse();
    groups.sort_by_key(|group| group.timestamp);
    groups
}

/// Uploads whatever the group carries and classifies the result
async fn upload_group(
    destination: &dyn Destination,
    group: &MeasurementGroup,
    height: Option<f64>,
    summary: &mut SyncSummary,
) -> GroupOutcome {
    let decoded = group.decode();
    let local = group.local_timestamp();
    let label = local.to_rfc3339();

    let mut attempted = 0;
    let mut succeeded = 0;

    if let Some(upload) = CompositionUpload::from_decoded(local, &decoded, height) {
        attempted += 1;
        match destination.upload_composition(&upload).await {
            Ok(()) => {
                succeeded += 1;
                summary.note(format!("{label}: uploaded weight {} kg", upload.weight));
            }
            Err(e) => {
                tracing::warn!(timestamp = %label, error = %e, "Body composition upload failed");
                summary.note(format!("{label}: body composition failed: {e}"));
                summary.add_error(SyncError::new(
                    UploadKind::Composition,
                    group.timestamp,
                    e.to_string(),
                ));
            }
        }
    }

    if let Some(upload) = BloodPressureUpload::from_decoded(local, &decoded) {
        attempted += 1;
        match destination.upload_blood_pressure(&upload).await {
            Ok(()) => {
                succeeded += 1;
                summary.note(format!(
                    "{label}: uploaded blood pressure {}/{}",
                    upload.systolic, upload.diastolic
                ));
            }
            Err(e) => {
                tracing::warn!(timestamp = %label, error = %e, "Blood pressure upload failed");
                summary.note(format!("{label}: blood pressure failed: {e}"));
                summary.add_error(SyncError::new(
                    UploadKind::BloodPressure,
                    group.timestamp,
                    e.to_string(),
                ));
            }
        }
    }

    match (attempted, succeeded) {
        (0, _) => {
            summary.note(format!("{label}: nothing to upload"));
            GroupOutcome::Skipped
        }
        (_, 0) => GroupOutcome::Failure,
        _ => GroupOutcome::Success,
    }
}
