//! Sync window selection

use crate::domain::{BridgeError, Category, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::fmt;

/// Time range and category of one sync run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,

    /// `None` leaves the upper end to the provider (now)
    pub end: Option<DateTime<Utc>>,

    pub category: Category,
}

impl SyncWindow {
    /// The last `days` days up to now
    pub fn last_days(days: u32, now: DateTime<Utc>, category: Category) -> Result<Self> {
        if days == 0 {
            return Err(BridgeError::Configuration(
                "Sync window must cover at least one day".to_string(),
            ));
        }

        Ok(Self {
            start: now - Duration::days(i64::from(days)),
            end: None,
            category,
        })
    }

    /// Whole calendar days in UTC, `end` inclusive
    pub fn from_dates(start: NaiveDate, end: Option<NaiveDate>, category: Category) -> Result<Self> {
        if let Some(end) = end {
            if end < start {
                return Err(BridgeError::Configuration(format!(
                    "End date {end} is before start date {start}"
                )));
            }
        }

        let start = start.and_time(NaiveTime::MIN).and_utc();
        let end = end
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc());

        Ok(Self {
            start,
            end,
            category,
        })
    }
}

impl fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} .. {}", self.start.to_rfc3339(), end.to_rfc3339()),
            None => write!(f, "{} .. now", self.start.to_rfc3339()),
        }
    }
}
