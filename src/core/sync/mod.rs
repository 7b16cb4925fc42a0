//! Historical batch sync
//!
//! - [`engine`] - the run loop
//! - [`window`] - which time range a run covers
//! - [`pacing`] - pauses between uploads
//! - [`summary`] - counters and the per-run log

pub mod engine;
pub mod pacing;
pub mod summary;
pub mod window;

pub use engine::{ProgressCallback, SyncEngine};
pub use pacing::Pacer;
pub use summary::{GroupOutcome, SyncError, SyncSummary, UploadKind};
pub use window::SyncWindow;
