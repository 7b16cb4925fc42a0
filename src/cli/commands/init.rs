//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "weighbridge.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Weighbridge configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, sample_config()) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Register an application at https://developer.withings.com");
                println!("  2. Create a .env file with your credentials:");
                println!("     - WITHINGS_CLIENT_ID and WITHINGS_CLIENT_SECRET");
                println!("     - GARMIN_EMAIL and GARMIN_PASSWORD");
                println!("  3. Set destination.base_url in {}", self.output);
                println!("  4. Validate configuration: weighbridge validate-config");
                println!("  5. Authorize Withings access: weighbridge authorize");
                println!("  6. Try a dry run: weighbridge sync --days 7 --dry-run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }
}

/// Sample configuration written by `init`
pub fn sample_config() -> &'static str {
    r#"# Weighbridge Configuration File
# Withings to fitness tracker sync bridge
#
# Values of the form ${VAR} are read from the environment (or .env).

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Log uploads instead of sending them
dry_run = false

# Directory for the token record, destination session and credentials.json
data_dir = "data"

[withings]
client_id = "${WITHINGS_CLIENT_ID}"
client_secret = "${WITHINGS_CLIENT_SECRET}"

# Must match the redirect URI registered with the Withings application
redirect_uri = "http://localhost:5000/auth/withings/callback"

# api_base_url = "https://wbsapi.withings.net"
# authorize_url = "https://account.withings.com/oauth2_user/authorize2"
# scope = "user.metrics,user.info,user.activity"
# oauth_state = "init_auth"
# timeout_seconds = 30
# token_file = "data/withings_tokens.json"

[destination]
email = "${GARMIN_EMAIL}"
password = "${GARMIN_PASSWORD}"
base_url = "https://upload.example.com/api"
# session_dir = "data/.session"
# timeout_seconds = 30

[sync]
# Default look-back window for `weighbridge sync`
days = 30

# real | user_objective
category = "real"

# Withings measure type codes
# 1 weight, 6 fat ratio, 76 muscle mass, 77 hydration, 88 bone mass,
# 12 visceral fat, 9 diastolic, 10 systolic, 11 heart rate
meas_types = [1, 6, 76, 77, 88, 12, 9, 10, 11]

# Pause between uploads
# pacing = { mode = "none" }
# pacing = { mode = "token_bucket", capacity = 5, refill_per_second = 0.5 }
pacing = { mode = "fixed", delay_ms = 1000 }

[logging]
local_enabled = true
local_path = "data/logs"
local_rotation = "daily"  # daily | hourly | never
"#
}
