//! Measurement domain model
//!
//! A Withings measurement group is a timestamped bundle of readings taken
//! together by one device. Each reading arrives as a scaled integer: the real
//! value is `value × 10^unit`. This module holds the typed group and the pure
//! decoding step that turns a group into the fields uploaded downstream.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Type codes understood by the bridge
///
/// Any other code the provider sends is ignored during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureType {
    /// Weight in kg
    Weight,
    /// Height in m
    Height,
    /// Fat ratio in %
    FatRatio,
    /// Diastolic blood pressure in mmHg
    Diastolic,
    /// Systolic blood pressure in mmHg
    Systolic,
    /// Heart pulse in bpm
    HeartRate,
    /// Visceral fat rating
    VisceralFat,
    /// Muscle mass in kg
    MuscleMass,
    /// Hydration (total body water) in kg
    HydrationMass,
    /// Bone mass in kg
    BoneMass,
}

impl MeasureType {
    /// All known types, in provider code order
    pub const ALL: [MeasureType; 10] = [
        MeasureType::Weight,
        MeasureType::Height,
        MeasureType::FatRatio,
        MeasureType::Diastolic,
        MeasureType::Systolic,
        MeasureType::HeartRate,
        MeasureType::VisceralFat,
        MeasureType::MuscleMass,
        MeasureType::HydrationMass,
        MeasureType::BoneMass,
    ];

    /// Provider type code
    pub const fn code(self) -> i32 {
        match self {
            MeasureType::Weight => 1,
            MeasureType::Height => 4,
            MeasureType::FatRatio => 6,
            MeasureType::Diastolic => 9,
            MeasureType::Systolic => 10,
            MeasureType::HeartRate => 11,
            MeasureType::VisceralFat => 12,
            MeasureType::MuscleMass => 76,
            MeasureType::HydrationMass => 77,
            MeasureType::BoneMass => 88,
        }
    }

    /// Maps a provider type code, `None` for codes outside the vocabulary
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}

/// Measurement group category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Actually measured by a device or entered as a real reading
    #[default]
    Real,
    /// User-entered goal, never uploaded by default
    UserObjective,
}

impl Category {
    /// Provider category code
    pub const fn code(self) -> i32 {
        match self {
            Category::Real => 1,
            Category::UserObjective => 2,
        }
    }

    /// Maps a provider category code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Category::Real),
            2 => Some(Category::UserObjective),
            _ => None,
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "real" => Ok(Category::Real),
            "user_objective" | "objective" => Ok(Category::UserObjective),
            other => Err(format!(
                "Invalid category '{other}'. Must be one of: real, user_objective"
            )),
        }
    }
}

/// A single scaled reading inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// Provider type code (may be outside [`MeasureType`])
    pub type_code: i32,

    /// Raw integer value
    pub value: i64,

    /// Power-of-ten exponent
    pub unit: i32,
}

impl Measure {
    /// Creates a measure from its raw triple
    pub fn new(type_code: i32, value: i64, unit: i32) -> Self {
        Self {
            type_code,
            value,
            unit,
        }
    }

    /// Typed measure kind, `None` for unknown codes
    pub fn measure_type(&self) -> Option<MeasureType> {
        MeasureType::from_code(self.type_code)
    }

    /// Real value, `value × 10^unit`
    ///
    /// Negative exponents divide by the positive power so decimal readings
    /// such as `700 × 10^-1` come out exact.
    pub fn real_value(&self) -> f64 {
        scaled_value(self.value, self.unit)
    }
}

/// Exponents past this saturate to infinity or zero anyway
const MAX_EXPONENT: u32 = 400;

/// Computes `value × 10^unit`
///
/// Never panics; absurd exponents saturate.
pub fn scaled_value(value: i64, unit: i32) -> f64 {
    let value = value as f64;
    let scale = 10f64.powi(unit.unsigned_abs().min(MAX_EXPONENT) as i32);
    if unit >= 0 {
        value * scale
    } else {
        value / scale
    }
}

/// A timestamped bundle of co-reported readings
///
/// # Examples
///
/// ```
/// use weighbridge::domain::measurement::{Category, MeasureType, MeasurementGroup};
/// use chrono::{TimeZone, Utc};
///
/// let group = MeasurementGroup::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap(), Category::Real)
///     .with_measure(MeasureType::Weight.code(), 7012, -2);
///
/// let decoded = group.decode();
/// assert_eq!(decoded.weight, Some(70.12));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementGroup {
    /// Provider group id, when known
    pub group_id: Option<i64>,

    /// Instant of the reading
    pub timestamp: DateTime<Utc>,

    /// Real reading or user objective
    pub category: Category,

    /// Readings in provider order
    pub measures: Vec<Measure>,
}

impl MeasurementGroup {
    /// Creates an empty group
    pub fn new(timestamp: DateTime<Utc>, category: Category) -> Self {
        Self {
            group_id: None,
            timestamp,
            category,
            measures: Vec::new(),
        }
    }

    /// Sets the provider group id
    pub fn with_group_id(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Appends a raw measure
    pub fn with_measure(mut self, type_code: i32, value: i64, unit: i32) -> Self {
        self.measures.push(Measure::new(type_code, value, unit));
        self
    }

    /// Decodes the group, see [`decode`]
    pub fn decode(&self) -> DecodedMeasurement {
        decode(self)
    }

    /// Timestamp in the host's local time zone
    pub fn local_timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp_in(&Local)
    }

    /// Timestamp converted to an explicit time zone
    pub fn timestamp_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<FixedOffset> {
        self.timestamp.with_timezone(tz).fixed_offset()
    }
}

/// Typed view of one group, derived by [`decode`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMeasurement {
    pub weight: Option<f64>,
    pub fat_ratio: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub hydration_mass: Option<f64>,
    pub bone_mass: Option<f64>,
    pub visceral_fat: Option<f64>,
    pub diastolic: Option<i32>,
    pub systolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub height: Option<f64>,
}

impl DecodedMeasurement {
    /// Weight usable for a composition upload
    ///
    /// A zero weight counts as absent.
    pub fn effective_weight(&self) -> Option<f64> {
        self.weight.filter(|w| *w != 0.0)
    }

    /// Whether the group carries a usable weight
    pub fn has_weight(&self) -> bool {
        self.effective_weight().is_some()
    }

    /// Whether both blood pressure components are present
    pub fn has_blood_pressure(&self) -> bool {
        self.systolic.is_some() && self.diastolic.is_some()
    }

    /// Whether the group is worth processing at all
    pub fn is_valid(&self) -> bool {
        self.has_weight() || self.has_blood_pressure()
    }

    /// `hydration / weight × 100`, only when both are present and non-zero
    pub fn percent_hydration(&self) -> Option<f64> {
        let weight = self.effective_weight()?;
        let hydration = self.hydration_mass.filter(|h| *h != 0.0)?;
        Some(hydration / weight * 100.0)
    }

    /// `weight / height²` for a cached height in metres
    pub fn bmi(&self, height: Option<f64>) -> Option<f64> {
        let weight = self.effective_weight()?;
        let height = height.filter(|h| *h != 0.0)?;
        Some(weight / (height * height))
    }
}

/// Decodes a measurement group
///
/// Pure and infallible: every measure is scaled and routed by type code,
/// later duplicates overwrite earlier ones and unknown codes are skipped.
pub fn decode(group: &MeasurementGroup) -> DecodedMeasurement {
    let mut decoded = DecodedMeasurement::default();

    for measure in &group.measures {
        let Some(measure_type) = measure.measure_type() else {
            tracing::trace!(type_code = measure.type_code, "Ignoring unknown measure type");
            continue;
        };
        let value = measure.real_value();

        match measure_type {
            MeasureType::Weight => decoded.weight = Some(value),
            MeasureType::Height => decoded.height = Some(value),
            MeasureType::FatRatio => decoded.fat_ratio = Some(value),
            MeasureType::MuscleMass => decoded.muscle_mass = Some(value),
            MeasureType::HydrationMass => decoded.hydration_mass = Some(value),
            MeasureType::BoneMass => decoded.bone_mass = Some(value),
            MeasureType::VisceralFat => decoded.visceral_fat = Some(value),
            MeasureType::Diastolic => decoded.diastolic = Some(round_to_int(value)),
            MeasureType::Systolic => decoded.systolic = Some(round_to_int(value)),
            MeasureType::HeartRate => decoded.heart_rate = Some(round_to_int(value)),
        }
    }

    decoded
}

fn round_to_int(value: f64) -> i32 {
    value.round() as i32
}
