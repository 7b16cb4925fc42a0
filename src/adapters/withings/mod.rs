//! Withings source adapter
//!
//! OAuth2 token grants and the measurement endpoint, plus the wire models
//! that map provider JSON onto [`crate::domain::MeasurementGroup`].

pub mod client;
pub mod models;

pub use client::{extract_code, MeasureQuery, WithingsClient};
pub use models::{ApiEnvelope, MeasureBody, TokenGrant};
