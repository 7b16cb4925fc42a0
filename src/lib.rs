// Weighbridge - Withings to fitness tracker sync bridge
// Copyright (c) 2025 Weighbridge Contributors
// Licensed under the MIT License

//! # Weighbridge - Withings to fitness tracker sync
//!
//! Weighbridge replays historical body measurements from a Withings account
//! into a fitness-tracker account as a one-shot batch.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Authorizing** against Withings with OAuth2 and keeping the token pair on disk
//! - **Fetching** measurement groups for a date window
//! - **Decoding** raw `(value, exponent)` measures into typed metrics
//! - **Uploading** body composition and blood pressure, oldest first, with pacing
//!
//! ## Architecture
//!
//! Weighbridge follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (authentication, token state, batch sync)
//! - [`adapters`] - External integrations (Withings API, destination)
//! - [`domain`] - Measurement model and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weighbridge::cli::commands::sync::build_engine;
//! use weighbridge::config::load_config;
//! use weighbridge::core::auth::NoInteraction;
//! use weighbridge::core::sync::SyncWindow;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("weighbridge.toml")?;
//!     let engine = build_engine(&config)?;
//!
//!     let window = SyncWindow::last_days(30, chrono::Utc::now(), config.sync.category)?;
//!     let (_tx, shutdown) = tokio::sync::watch::channel(false);
//!     let summary = engine.run_batch(&window, None, &NoInteraction, shutdown).await?;
//!
//!     println!("Uploaded {} of {} groups", summary.successful, summary.total_groups);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All library operations return [`domain::Result`], whose error type
//! [`domain::BridgeError`] wraps the source and destination error enums.
//! Upload failures never abort a run; they are collected in the summary.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
