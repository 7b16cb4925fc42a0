//! Destination adapters
//!
//! The sync engine only talks to [`Destination`]. [`ConnectDestination`]
//! performs real uploads over HTTP; [`DryRunDestination`] logs them.

pub mod connect;
pub mod dry_run;
pub mod traits;

pub use connect::{ConnectDestination, Session, SESSION_FILE};
pub use dry_run::DryRunDestination;
pub use traits::{BloodPressureUpload, CompositionUpload, Destination};
