//! Configuration management for Weighbridge.
//!
//! Weighbridge uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `WEIGHBRIDGE_<SECTION>_<KEY>` environment overrides
//! - A `credentials.json` fallback inside the data directory
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//! data_dir = "data"
//!
//! [withings]
//! client_id = "your-client-id"
//! client_secret = "${WITHINGS_CLIENT_SECRET}"
//! redirect_uri = "http://localhost:5000/auth/withings/callback"
//!
//! [destination]
//! email = "you@example.com"
//! password = "${GARMIN_PASSWORD}"
//! base_url = "https://upload.example.com/api"
//!
//! [sync]
//! days = 30
//! pacing = { mode = "fixed", delay_ms = 1000 }
//! ```
//!
//! # Loading
//!
//! ```rust,no_run
//! use weighbridge::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("weighbridge.toml")?;
//! println!("Syncing the last {} days", config.sync.days);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_unchecked};
pub use schema::{
    ApplicationConfig, BridgeConfig, DestinationConfig, LoggingConfig, PacingPolicy, SyncConfig,
    WithingsConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
