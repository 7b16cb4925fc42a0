//! Sync command implementation
//!
//! This module implements the `sync` command, which replays one window of
//! Withings history to the destination, or with `--latest` only the newest
//! weighing (the daily scheduled sync).

use super::exit_code_for;
use crate::adapters::destination::{ConnectDestination, Destination, DryRunDestination};
use crate::adapters::withings::WithingsClient;
use crate::cli::prompt::StdinCodeProvider;
use crate::config::{load_config_unchecked, BridgeConfig};
use crate::core::auth::SourceAuthenticator;
use crate::core::state::TokenStore;
use crate::core::sync::{ProgressCallback, SyncEngine, SyncSummary, SyncWindow};
use crate::domain::{Category, Result};
use crate::log_error_with_context;
use chrono::{NaiveDate, Utc};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Number of days to look back (defaults to sync.days)
    #[arg(long, conflicts_with = "start")]
    pub days: Option<u32>,

    /// First day to sync (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day to sync, inclusive (YYYY-MM-DD, UTC)
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Upload only the newest group with a weight
    #[arg(long, conflicts_with_all = ["days", "start", "end"])]
    pub latest: bool,

    /// Dry run mode - log uploads without sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Override the measurement category (real or user-objective)
    #[arg(long)]
    pub category: Option<Category>,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let mut config = match load_config_unchecked(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        if let Some(category) = self.category {
            tracing::info!(category = ?category, "Overriding category from CLI");
            config.sync.category = category;
        }
        if let Some(days) = self.days {
            config.sync.days = days;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let window = if self.latest {
            None
        } else {
            match self.window(&config) {
                Ok(w) => Some(w),
                Err(e) => {
                    eprintln!("Invalid sync window: {e}");
                    return Ok(2);
                }
            }
        };

        let engine = match build_engine(&config) {
            Ok(engine) => engine,
            Err(e) => {
                log_error_with_context!(e, "Failed to initialize sync");
                eprintln!("Failed to initialize sync: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - Nothing will be uploaded");
            println!();
        }
        match &window {
            Some(window) => println!("🚀 Syncing {window}"),
            None => println!("🚀 Syncing the latest weighing"),
        }
        println!();

        let progress: ProgressCallback = Box::new(|current, total| {
            println!("  [{current}/{total}] processed");
        });

        let result = match &window {
            Some(window) => {
                engine
                    .run_batch(window, Some(progress), &StdinCodeProvider, shutdown_signal)
                    .await
            }
            None => {
                engine
                    .run_latest(
                        config.sync.category,
                        Some(progress),
                        &StdinCodeProvider,
                        shutdown_signal,
                    )
                    .await
            }
        };

        let summary = match result {
            Ok(s) => s,
            Err(e) => {
                log_error_with_context!(e, "Sync failed");
                eprintln!("Sync failed: {e}");
                if e.requires_authorization() {
                    println!("Run 'weighbridge authorize' to grant access, then re-run sync.");
                }
                return Ok(exit_code_for(&e));
            }
        };

        print_summary(&summary);
        Ok(summary_exit_code(&summary))
    }

    fn window(&self, config: &BridgeConfig) -> Result<SyncWindow> {
        match self.start {
            Some(start) => SyncWindow::from_dates(start, self.end, config.sync.category),
            None => SyncWindow::last_days(config.sync.days, Utc::now(), config.sync.category),
        }
    }
}

/// Wires the engine from configuration
pub fn build_engine(config: &BridgeConfig) -> Result<SyncEngine> {
    let client = WithingsClient::new(&config.withings)?;
    let authenticator = SourceAuthenticator::new(
        client,
        TokenStore::new(config.token_file_path()),
        config.withings.oauth_state.clone(),
    );

    let destination: Box<dyn Destination> = if config.application.dry_run {
        Box::new(DryRunDestination::new())
    } else {
        Box::new(ConnectDestination::new(
            &config.destination,
            config.session_dir_path(),
        )?)
    };

    Ok(
        SyncEngine::new(config.sync.clone(), authenticator, destination)
            .with_dry_run(config.application.dry_run),
    )
}

fn print_summary(summary: &SyncSummary) {
    println!();
    println!("📊 Sync Summary:");
    println!("  Groups found: {}", summary.total_groups);
    println!("  Filtered out: {}", summary.filtered_out);
    println!("  Processed: {}", summary.processed);
    println!("  Successful: {}", summary.successful);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped: {}", summary.skipped);
    match summary.height {
        Some(h) => println!("  Height: {h:.2} m"),
        None => println!("  Height: unknown (BMI not sent)"),
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {error}");
        }
        println!();
    }
}

fn summary_exit_code(summary: &SyncSummary) -> i32 {
    if summary.interrupted {
        println!("⚠️  Sync interrupted. Re-run the same command to continue;");
        println!("   groups already uploaded will be sent again.");
        tracing::info!("Sync interrupted by user signal");
        130
    } else if summary.failed > 0 {
        println!("⚠️  Sync completed with failures. Re-run to retry.");
        1
    } else {
        println!("✅ Sync completed successfully!");
        0
    }
}
