//! Domain models and types for Weighbridge.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Measurement model** ([`MeasurementGroup`], [`Measure`], [`DecodedMeasurement`])
//! - **Error types** ([`BridgeError`], [`SourceError`], [`DestinationError`])
//! - **Result type alias** ([`Result`])
//!
//! # Decoding
//!
//! Every measure is stored as a raw integer plus a power-of-ten exponent.
//! [`decode`] turns a whole group into typed optional fields:
//!
//! ```rust
//! use weighbridge::domain::{decode, Category, MeasurementGroup};
//! use chrono::Utc;
//!
//! let group = MeasurementGroup::new(Utc::now(), Category::Real)
//!     .with_measure(10, 120, 0)
//!     .with_measure(9, 80, 0);
//!
//! let decoded = decode(&group);
//! assert!(decoded.has_blood_pressure());
//! assert!(!decoded.has_weight());
//! ```

pub mod errors;
pub mod measurement;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{BridgeError, DestinationError, SourceError};
pub use measurement::{
    decode, Category, DecodedMeasurement, Measure, MeasureType, MeasurementGroup,
};
pub use result::Result;
