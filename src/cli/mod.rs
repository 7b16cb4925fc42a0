//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Weighbridge using clap.

pub mod commands;
pub mod prompt;

use clap::{Parser, Subcommand};

/// Weighbridge - Withings to fitness tracker sync bridge
#[derive(Parser, Debug)]
#[command(name = "weighbridge")]
#[command(version, about, long_about = None)]
#[command(author = "Weighbridge Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "weighbridge.toml", env = "WEIGHBRIDGE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "WEIGHBRIDGE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay historical measurements to the destination
    Sync(commands::sync::SyncArgs),

    /// Authorize access to the Withings account
    Authorize(commands::authorize::AuthorizeArgs),

    /// Show token and session state
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
