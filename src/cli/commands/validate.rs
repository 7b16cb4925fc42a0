//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Weighbridge configuration file.

use crate::config::{load_config_unchecked, PacingPolicy};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config_unchecked(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match config.validate() {
            Ok(()) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Dry Run: {}", config.application.dry_run);
                println!("  Data Directory: {}", config.application.data_dir);
                println!("  Withings API: {}", config.withings.api_base_url);
                println!("  Withings Client ID: {}", config.withings.client_id);
                println!("  Redirect URI: {}", config.withings.redirect_uri);
                println!("  Token File: {}", config.token_file_path().display());
                if config.application.dry_run {
                    println!("  Destination: dry run (nothing uploaded)");
                } else {
                    println!("  Destination: {}", config.destination.base_url);
                    println!(
                        "  Destination Account: {}",
                        config.destination.email.as_deref().unwrap_or_default()
                    );
                    println!("  Session Directory: {}", config.session_dir_path().display());
                }
                println!("  Default Window: {} days", config.sync.days);
                println!("  Category: {:?}", config.sync.category);
                println!("  Measure Types: {:?}", config.sync.meas_types);
                println!("  Pacing: {}", describe_pacing(&config.sync.pacing));
                println!(
                    "  File Logging: {}",
                    if config.logging.local_enabled {
                        config.logging.local_path.as_str()
                    } else {
                        "disabled"
                    }
                );
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}

fn describe_pacing(policy: &PacingPolicy) -> String {
    match policy {
        PacingPolicy::None => "none".to_string(),
        PacingPolicy::Fixed { delay_ms } => format!("fixed {delay_ms} ms"),
        PacingPolicy::TokenBucket {
            capacity,
            refill_per_second,
        } => format!("token bucket, burst {capacity}, {refill_per_second}/s"),
    }
}
