//! Destination that only logs

use super::traits::{BloodPressureUpload, CompositionUpload, Destination};
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Logs every upload instead of sending it
#[derive(Debug, Default)]
pub struct DryRunDestination {
    compositions: AtomicUsize,
    blood_pressures: AtomicUsize,
}

impl DryRunDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composition uploads seen so far
    pub fn composition_count(&self) -> usize {
        self.compositions.load(Ordering::Relaxed)
    }

    /// Blood-pressure uploads seen so far
    pub fn blood_pressure_count(&self) -> usize {
        self.blood_pressures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Destination for DryRunDestination {
    async fn login(&mut self) -> Result<()> {
        tracing::info!("Dry run: skipping destination login");
        Ok(())
    }

    async fn upload_composition(&self, upload: &CompositionUpload) -> Result<()> {
        self.compositions.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            timestamp = %upload.timestamp.to_rfc3339(),
            weight = upload.weight,
            percent_fat = ?upload.percent_fat,
            percent_hydration = ?upload.percent_hydration,
            bmi = ?upload.bmi,
            "Dry run: would upload body composition"
        );
        Ok(())
    }

    async fn upload_blood_pressure(&self, upload: &BloodPressureUpload) -> Result<()> {
        self.blood_pressures.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            timestamp = %upload.timestamp.to_rfc3339(),
            systolic = upload.systolic,
            diastolic = upload.diastolic,
            pulse = ?upload.pulse,
            "Dry run: would upload blood pressure"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[tokio::test]
    async fn test_dry_run_counts_uploads() {
        let mut dest = DryRunDestination::new();
        dest.login().await.unwrap();

        let timestamp = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 7, 0, 0)
            .unwrap();
        dest.upload_blood_pressure(&BloodPressureUpload {
            timestamp,
            systolic: 118,
            diastolic: 76,
            pulse: Some(60),
        })
        .await
        .unwrap();

        assert_eq!(dest.blood_pressure_count(), 1);
        assert_eq!(dest.composition_count(), 0);
        assert_eq!(dest.name(), "dry-run");
    }
}
