//! Configuration schema types
//!
//! This module defines the configuration structure for Weighbridge. A
//! [`BridgeConfig`] is loaded once and handed to every component when it is
//! constructed; nothing reads configuration from global state.

use crate::config::SecretString;
use crate::domain::measurement::{Category, MeasureType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Weighbridge configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Source provider (Withings) settings
    #[serde(default)]
    pub withings: WithingsConfig,

    /// Destination provider settings
    #[serde(default)]
    pub destination: DestinationConfig,

    /// Batch sync settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.withings.validate()?;
        self.destination.validate(self.application.dry_run)?;
        self.sync.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Validates only what talking to Withings needs
    ///
    /// Used by commands that never reach the destination.
    pub fn validate_source(&self) -> Result<(), String> {
        self.application.validate()?;
        self.withings.validate()
    }

    /// Path of the Withings token record
    pub fn token_file_path(&self) -> PathBuf {
        match &self.withings.token_file {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.application.data_dir).join("withings_tokens.json"),
        }
    }

    /// Directory holding the destination session
    pub fn session_dir_path(&self) -> PathBuf {
        match &self.destination.session_dir {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.application.data_dir).join(".session"),
        }
    }

    /// Optional JSON file with credentials entered outside the TOML file
    pub fn credentials_file_path(&self) -> PathBuf {
        PathBuf::from(&self.application.data_dir).join("credentials.json")
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (log uploads instead of sending them)
    #[serde(default)]
    pub dry_run: bool,

    /// Directory for tokens, sessions and the credentials file
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.data_dir.is_empty() {
            return Err("application.data_dir cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
            data_dir: default_data_dir(),
        }
    }
}

/// Withings (source provider) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithingsConfig {
    /// OAuth2 client id from the Withings developer dashboard
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub client_secret: Option<SecretString>,

    /// Redirect URI registered with the application
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Base URL of the Withings API (token and measure endpoints)
    #[serde(default = "default_withings_api_base_url")]
    pub api_base_url: String,

    /// User-facing authorization endpoint
    #[serde(default = "default_withings_authorize_url")]
    pub authorize_url: String,

    /// OAuth scopes requested during authorization
    #[serde(default = "default_withings_scope")]
    pub scope: String,

    /// Anti-forgery `state` value sent with the authorization request
    #[serde(default = "default_oauth_state")]
    pub oauth_state: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Token record path (defaults to `<data_dir>/withings_tokens.json`)
    #[serde(default)]
    pub token_file: Option<String>,
}

impl WithingsConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.client_id.is_empty() {
            return Err("withings.client_id is required".to_string());
        }

        match &self.client_secret {
            Some(secret) if !secret.expose_secret().is_empty() => {}
            _ => return Err("withings.client_secret is required".to_string()),
        }

        for (name, value) in [
            ("withings.api_base_url", &self.api_base_url),
            ("withings.authorize_url", &self.authorize_url),
            ("withings.redirect_uri", &self.redirect_uri),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(format!("{name} must start with http:// or https://"));
            }
        }

        if self.oauth_state.is_empty() {
            return Err("withings.oauth_state cannot be empty".to_string());
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(format!(
                "withings.timeout_seconds must be between 1 and 300, got {}",
                self.timeout_seconds
            ));
        }

        Ok(())
    }
}

impl Default for WithingsConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            api_base_url: default_withings_api_base_url(),
            authorize_url: default_withings_authorize_url(),
            scope: default_withings_scope(),
            oauth_state: default_oauth_state(),
            timeout_seconds: default_timeout_seconds(),
            token_file: None,
        }
    }
}

/// Destination provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Account email
    #[serde(default)]
    pub email: Option<String>,

    /// Account password
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Base URL of the upload service
    #[serde(default)]
    pub base_url: String,

    /// Session directory (defaults to `<data_dir>/.session`)
    #[serde(default)]
    pub session_dir: Option<String>,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl DestinationConfig {
    fn validate(&self, dry_run: bool) -> Result<(), String> {
        // Dry runs never talk to the destination
        if dry_run {
            return Ok(());
        }

        if self.email.as_deref().unwrap_or_default().is_empty() {
            return Err("destination.email is required unless dry_run is enabled".to_string());
        }

        if self.password.is_none() {
            return Err("destination.password is required unless dry_run is enabled".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("destination.base_url must start with http:// or https://".to_string());
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(format!(
                "destination.timeout_seconds must be between 1 and 300, got {}",
                self.timeout_seconds
            ));
        }

        Ok(())
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            base_url: String::new(),
            session_dir: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Inter-upload pacing policy
///
/// The destination rate-limits rapid writes, so uploads are spaced out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PacingPolicy {
    /// No pause between groups
    None,
    /// Fixed pause between groups
    Fixed {
        /// Pause in milliseconds
        delay_ms: u64,
    },
    /// Token bucket allowing short bursts
    TokenBucket {
        /// Maximum burst size
        capacity: u32,
        /// Tokens added per second
        refill_per_second: f64,
    },
}

impl Default for PacingPolicy {
    fn default() -> Self {
        PacingPolicy::Fixed { delay_ms: 1000 }
    }
}

impl PacingPolicy {
    fn validate(&self) -> Result<(), String> {
        match self {
            PacingPolicy::None => Ok(()),
            PacingPolicy::Fixed { delay_ms } => {
                if *delay_ms > 60_000 {
                    return Err(format!(
                        "sync.pacing.delay_ms must be <= 60000, got {delay_ms}"
                    ));
                }
                Ok(())
            }
            PacingPolicy::TokenBucket {
                capacity,
                refill_per_second,
            } => {
                if *capacity == 0 {
                    return Err("sync.pacing.capacity must be > 0".to_string());
                }
                if !refill_per_second.is_finite() || *refill_per_second <= 0.0 {
                    return Err(format!(
                        "sync.pacing.refill_per_second must be > 0, got {refill_per_second}"
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Batch sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Default look-back window in days
    #[serde(default = "default_days")]
    pub days: u32,

    /// Category requested from the provider
    #[serde(default)]
    pub category: Category,

    /// Measure type codes requested from the provider
    #[serde(default = "default_meas_types")]
    pub meas_types: Vec<i32>,

    /// Inter-upload pacing
    #[serde(default)]
    pub pacing: PacingPolicy,
}

impl SyncConfig {
    fn validate(&self) -> Result<(), String> {
        if self.days == 0 || self.days > 3650 {
            return Err(format!(
                "sync.days must be between 1 and 3650, got {}",
                self.days
            ));
        }

        if self.meas_types.is_empty() {
            return Err("sync.meas_types cannot be empty".to_string());
        }

        if let Some(unknown) = self
            .meas_types
            .iter()
            .find(|code| MeasureType::from_code(**code).is_none())
        {
            return Err(format!("sync.meas_types contains unknown type code {unknown}"));
        }

        self.pacing.validate()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            category: Category::default(),
            meas_types: default_meas_types(),
            pacing: PacingPolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:5000/auth/withings/callback".to_string()
}

fn default_withings_api_base_url() -> String {
    "https://wbsapi.withings.net".to_string()
}

fn default_withings_authorize_url() -> String {
    "https://account.withings.com/oauth2_user/authorize2".to_string()
}

fn default_withings_scope() -> String {
    "user.metrics,user.info,user.activity".to_string()
}

fn default_oauth_state() -> String {
    "init_auth".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_days() -> u32 {
    30
}

fn default_meas_types() -> Vec<i32> {
    [
        MeasureType::Weight,
        MeasureType::FatRatio,
        MeasureType::MuscleMass,
        MeasureType::HydrationMass,
        MeasureType::BoneMass,
        MeasureType::VisceralFat,
        MeasureType::Diastolic,
        MeasureType::Systolic,
        MeasureType::HeartRate,
    ]
    .iter()
    .map(|t| t.code())
    .collect()
}

fn default_local_path() -> String {
    "data/logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
