//! Core data models for the RUL lifecycle service

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One raw telemetry reading, produced upstream and consumed read-only.
///
/// Field names follow the NDJSON blobs the ingestion pipeline writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    #[serde(rename = "equipId")]
    pub equipment_id: String,
    #[serde(rename = "zoneId")]
    pub zone_id: String,
    #[serde(rename = "sensorType")]
    pub channel: String,
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "val")]
    pub value: f64,
}

/// Ordered list of feature columns a model was trained on.
///
/// Persisted inside every artifact so inference validates against the
/// training-time columns instead of assuming an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Columns of `self` that the other schema does not provide
    pub fn missing_from(&self, other: &FeatureSchema) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| other.index_of(c).is_none())
            .cloned()
            .collect()
    }
}

/// One row per (equipment, hour-floored timestamp), values aligned to the
/// owning table's schema. The label carries the RUL target on the training
/// path and stays `None` for inference rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideFeatureRow {
    pub equipment_id: String,
    pub timestamp: DateTime<Utc>,
    pub values: Vec<f64>,
    pub label: Option<f64>,
}

/// Wide-format feature table. All rows share `schema` column-for-column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    pub rows: Vec<WideFeatureRow>,
}

impl FeatureTable {
    pub fn empty() -> Self {
        Self {
            schema: FeatureSchema::new(Vec::new()),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Holdout evaluation metrics recorded alongside each trained model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// Pass/skip decision from the sufficiency gate, with the observed metric
/// and the threshold it was compared against. Created per check, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SufficiencyVerdict {
    pub passed: bool,
    pub observed_days: usize,
    pub required_days: usize,
}

impl SufficiencyVerdict {
    pub fn is_pass(&self) -> bool {
        self.passed
    }
}

/// Inclusive calendar-date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Full calendar month, e.g. `month(2025, 6)` covers June 1st through
    /// June 30th
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            start,
            end: next.pred_opt()?,
        })
    }

    /// Parse a `YYYY-MM` month key
    pub fn parse_month(s: &str) -> Option<Self> {
        let (year, month) = s.split_once('-')?;
        Self::month(year.parse().ok()?, month.parse().ok()?)
    }

    /// Window of `days` consecutive days ending at `end` inclusive
    pub fn lookback(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        let start = end - chrono::Duration::days(span);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every calendar day in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Partition of the equipment fleet a load or retrain applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentScope {
    /// Every zone and equipment under the data prefix
    Fleet,
    Zone {
        zone_id: String,
    },
    Equipment {
        zone_id: String,
        equipment_id: String,
    },
}

impl EquipmentScope {
    pub fn equipment(zone_id: impl Into<String>, equipment_id: impl Into<String>) -> Self {
        EquipmentScope::Equipment {
            zone_id: zone_id.into(),
            equipment_id: equipment_id.into(),
        }
    }
}

impl fmt::Display for EquipmentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquipmentScope::Fleet => write!(f, "fleet"),
            EquipmentScope::Zone { zone_id } => write!(f, "zone {zone_id}"),
            EquipmentScope::Equipment {
                zone_id,
                equipment_id,
            } => write!(f, "equipment {zone_id}/{equipment_id}"),
        }
    }
}

/// Inference result returned to the API layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulPrediction {
    pub zone_id: String,
    pub equipment_id: String,
    /// Predicted remaining useful life, in hours
    pub rul_estimate: f64,
    pub model_version: String,
    /// Timestamp of the feature row the estimate was computed from
    pub observed_at: DateTime<Utc>,
}

/// A trained regressor plus the metadata needed to serve and audit it.
///
/// Immutable once written to the store; a retrain only ever creates a new
/// version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub schema: FeatureSchema,
    pub window: TimeRange,
    pub trained_rows: usize,
    pub metrics: TrainingMetrics,
    pub model: crate::predictor::GbdtModel,
}

/// Derive a version identifier from a timestamp. Millisecond precision keeps
/// identifiers monotonic even for retrains landing in the same second.
pub fn version_for(now: DateTime<Utc>) -> String {
    format!("v{}", now.format("%Y%m%d%H%M%S%3f"))
}
