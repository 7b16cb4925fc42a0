//! External system integrations for Weighbridge.
//!
//! - [`withings`] - source provider: OAuth2 token grants and measurement fetch
//! - [`destination`] - fitness-tracker upload targets behind the
//!   [`destination::Destination`] trait
//!
//! # Design Pattern
//!
//! Adapters isolate the HTTP details of each vendor so the sync engine can be
//! exercised against mock servers and in-memory destinations.
//!
//! ```rust,no_run
//! use weighbridge::adapters::destination::{Destination, DryRunDestination};
//!
//! # async fn example() -> weighbridge::domain::Result<()> {
//! let mut destination = DryRunDestination::new();
//! destination.login().await?;
//! # Ok(())
//! # }
//! ```

pub mod destination;
pub mod withings;
