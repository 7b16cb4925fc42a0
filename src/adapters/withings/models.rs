//! Withings API wire models
//!
//! Every Withings response is wrapped in `{"status": <int>, "body": {...}}`.
//! A `status` of 0 means success; anything else is an API-level error whose
//! full payload is kept for diagnostics.

use crate::domain::measurement::{Category, Measure, MeasurementGroup};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Response envelope shared by all endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    /// Provider status code, 0 on success
    pub status: i64,

    /// Endpoint specific body
    #[serde(default)]
    pub body: Value,

    /// Error description on some failures
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiEnvelope {
    /// Whether the provider reported success
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Body of a successful `requesttoken` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub expires_in: Option<i64>,

    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub userid: Option<String>,

    /// Remaining provider fields (csrf_token, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a successful `getmeas` call
///
/// Malformed groups and measures are dropped one by one with a warning; the
/// rest of the body still decodes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasureBody {
    #[serde(default, deserialize_with = "lenient_groups")]
    pub measuregrps: Vec<WireGroup>,

    /// Set to 1 when the provider truncated the result
    #[serde(default)]
    pub more: Option<i64>,

    #[serde(default)]
    pub timezone: Option<String>,
}

/// Measurement group as sent by Withings
#[derive(Debug, Clone, Deserialize)]
pub struct WireGroup {
    #[serde(default)]
    pub grpid: Option<i64>,

    /// Epoch seconds, UTC
    pub date: i64,

    pub category: i32,

    #[serde(default, deserialize_with = "lenient_measures")]
    pub measures: Vec<WireMeasure>,
}

/// Single scaled reading as sent by Withings
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WireMeasure {
    pub value: i64,

    #[serde(rename = "type")]
    pub type_code: i32,

    pub unit: i32,
}

impl WireGroup {
    /// Converts into the domain group
    ///
    /// Returns `None` for unknown categories or out-of-range dates.
    pub fn into_domain(self) -> Option<MeasurementGroup> {
        let Some(category) = Category::from_code(self.category) else {
            tracing::warn!(
                grpid = ?self.grpid,
                category = self.category,
                "Dropping measurement group with unknown category"
            );
            return None;
        };

        let timestamp: DateTime<Utc> = match Utc.timestamp_opt(self.date, 0).single() {
            Some(ts) => ts,
            None => {
                tracing::warn!(grpid = ?self.grpid, date = self.date, "Dropping measurement group with invalid date");
                return None;
            }
        };

        Some(MeasurementGroup {
            group_id: self.grpid,
            timestamp,
            category,
            measures: self
                .measures
                .into_iter()
                .map(|m| Measure::new(m.type_code, m.value, m.unit))
                .collect(),
        })
    }
}

fn lenient_groups<'de, D>(deserializer: D) -> Result<Vec<WireGroup>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_vec(deserializer, "measurement group")
}

fn lenient_measures<'de, D>(deserializer: D) -> Result<Vec<WireMeasure>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_vec(deserializer, "measure")
}

/// Decodes an array entry by entry, skipping entries that do not fit `T`
fn lenient_vec<'de, D, T>(deserializer: D, kind: &'static str) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(kind, error = %e, entry = %entry, "Skipping malformed entry");
                None
            }
        })
        .collect())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
