//! Core business logic for Weighbridge.
//!
//! # Modules
//!
//! - [`auth`] - Withings token lifecycle (refresh or interactive authorization)
//! - [`state`] - Token persistence with crash-safe writes
//! - [`sync`] - The historical batch sync engine
//!
//! # Sync Workflow
//!
//! 1. **Authenticate**: refresh the stored Withings token, or ask for a code
//! 2. **Login**: open or restore the destination session
//! 3. **Height**: fetch the latest height once for BMI (best effort)
//! 4. **Fetch**: read all measurement groups in the window
//! 5. **Filter & order**: keep groups with a weight or a blood-pressure pair,
//!    oldest first
//! 6. **Upload**: one group at a time, pausing between groups
//! 7. **Report**: return a [`sync::SyncSummary`]

pub mod auth;
pub mod state;
pub mod sync;
