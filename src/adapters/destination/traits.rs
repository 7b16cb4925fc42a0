//! Destination trait and upload payloads

use crate::domain::{DecodedMeasurement, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Body-composition write
///
/// Optional metrics are left out of the serialized payload entirely when
/// absent, so a missing BMI is never sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionUpload {
    /// Local-zone reading time, serialized as ISO-8601
    pub timestamp: DateTime<FixedOffset>,

    pub weight: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_fat: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_hydration: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visceral_fat_rating: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bone_mass: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_mass: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
}

impl CompositionUpload {
    /// Builds the payload, `None` when the group has no usable weight
    pub fn from_decoded(
        timestamp: DateTime<FixedOffset>,
        decoded: &DecodedMeasurement,
        height: Option<f64>,
    ) -> Option<Self> {
        let weight = decoded.effective_weight()?;

        Some(Self {
            timestamp,
            weight,
            percent_fat: decoded.fat_ratio,
            percent_hydration: decoded.percent_hydration(),
            visceral_fat_rating: decoded.visceral_fat,
            bone_mass: decoded.bone_mass,
            muscle_mass: decoded.muscle_mass,
            bmi: decoded.bmi(height),
        })
    }
}

/// Blood-pressure write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodPressureUpload {
    /// Local-zone reading time, serialized as ISO-8601
    pub timestamp: DateTime<FixedOffset>,

    pub systolic: i32,

    pub diastolic: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<i32>,
}

impl BloodPressureUpload {
    /// Builds the payload, `None` unless both components are present
    pub fn from_decoded(timestamp: DateTime<FixedOffset>, decoded: &DecodedMeasurement) -> Option<Self> {
        match (decoded.systolic, decoded.diastolic) {
            (Some(systolic), Some(diastolic)) => Some(Self {
                timestamp,
                systolic,
                diastolic,
                pulse: decoded.heart_rate,
            }),
            _ => None,
        }
    }
}

/// Fitness-tracker account receiving the uploads
///
/// Each upload may fail on its own; callers treat those failures per item.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Establishes or restores a session
    ///
    /// # Errors
    ///
    /// Returns an error when credentials are rejected or the service is
    /// unreachable. The sync run aborts in that case.
    async fn login(&mut self) -> Result<()>;

    /// Writes one body-composition entry
    async fn upload_composition(&self, upload: &CompositionUpload) -> Result<()>;

    /// Writes one blood-pressure entry
    async fn upload_blood_pressure(&self, upload: &BloodPressureUpload) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &str;
}
