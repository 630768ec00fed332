//! Wide-format feature transform
//!
//! Pivots long-format sensor records into one row per (equipment, hour)
//! with one column per channel, then derives rolling statistics and the
//! power factor. Deterministic and side-effect-free: rows and columns are
//! sorted, duplicate readings aggregate with `max`, so any permutation of
//! the same input yields an identical table.

use crate::error::{LifecycleError, Result};
use crate::models::{FeatureSchema, FeatureTable, SensorRecord, WideFeatureRow};
use chrono::{DateTime, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Channels the model consumes; anything else is dropped by the transform
pub const SENSOR_CHANNELS: [&str; 6] = [
    "active_power",
    "humidity",
    "pressure",
    "reactive_power",
    "temperature",
    "vibration",
];

/// Rolling mean/std window, in hourly rows
pub const ROLLING_WINDOW: usize = 5;

/// Fill value for a channel with no reading in an hour. A fixed sentinel
/// keeps the column set identical across calls for the same equipment.
pub const MISSING_SENTINEL: f64 = 0.0;

/// Map upstream channel spellings to their canonical names
pub fn canonical_channel(raw: &str) -> Option<&'static str> {
    let canonical = match raw {
        "temp" => "temperature",
        "humid" => "humidity",
        other => other,
    };
    SENSOR_CHANNELS.iter().copied().find(|c| *c == canonical)
}

fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(ts.hour(), 0, 0)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or(ts)
}

/// Pivot raw records into a wide feature table.
///
/// Column order: the sorted observed channels, then `{ch}_rollmean` and
/// `{ch}_rollstd` per channel in the same order, then `power_factor` when
/// both power channels are present. Rows are sorted by (equipment, hour).
pub fn to_wide(records: &[SensorRecord]) -> FeatureTable {
    // (equipment, hour) -> channel -> max reading
    let mut cells: BTreeMap<(String, DateTime<Utc>), BTreeMap<&'static str, f64>> = BTreeMap::new();
    let mut observed: BTreeSet<&'static str> = BTreeSet::new();

    for record in records {
        let Some(channel) = canonical_channel(&record.channel) else {
            continue;
        };
        observed.insert(channel);
        let hour = floor_to_hour(record.timestamp);
        let entry = cells
            .entry((record.equipment_id.clone(), hour))
            .or_default()
            .entry(channel)
            .or_insert(record.value);
        if record.value > *entry {
            *entry = record.value;
        }
    }

    if cells.is_empty() {
        return FeatureTable::empty();
    }

    let channels: Vec<&'static str> = observed.iter().copied().collect();
    let with_power_factor =
        observed.contains("active_power") && observed.contains("reactive_power");

    let mut columns: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
    for channel in &channels {
        columns.push(format!("{channel}_rollmean"));
        columns.push(format!("{channel}_rollstd"));
    }
    if with_power_factor {
        columns.push("power_factor".to_string());
    }
    let schema = FeatureSchema::new(columns);

    // Per-equipment rolling history, one window per channel
    let mut history: HashMap<String, Vec<VecDeque<f64>>> = HashMap::new();
    let mut rows = Vec::with_capacity(cells.len());

    for ((equipment_id, hour), readings) in cells {
        let windows = history
            .entry(equipment_id.clone())
            .or_insert_with(|| vec![VecDeque::with_capacity(ROLLING_WINDOW); channels.len()]);

        let mut values = Vec::with_capacity(schema.len());
        let mut raw = Vec::with_capacity(channels.len());
        for channel in &channels {
            raw.push(readings.get(channel).copied().unwrap_or(MISSING_SENTINEL));
        }
        values.extend_from_slice(&raw);

        for (idx, value) in raw.iter().enumerate() {
            let window = &mut windows[idx];
            if window.len() == ROLLING_WINDOW {
                window.pop_front();
            }
            window.push_back(*value);
            values.push(mean(window));
            values.push(sample_std(window));
        }

        if with_power_factor {
            let active = raw[channels.iter().position(|c| *c == "active_power").unwrap_or(0)];
            let reactive =
                raw[channels.iter().position(|c| *c == "reactive_power").unwrap_or(0)];
            values.push(power_factor(active, reactive));
        }

        rows.push(WideFeatureRow {
            equipment_id,
            timestamp: hour,
            values,
            label: None,
        });
    }

    FeatureTable { schema, rows }
}

/// Reorder every row's values to match `expected`, for inference against a
/// trained model. Fails when the table lacks columns the model requires.
pub fn project_rows(
    table: &FeatureTable,
    expected: &FeatureSchema,
    scope: &str,
) -> Result<Vec<Vec<f64>>> {
    let missing = expected.missing_from(&table.schema);
    if !missing.is_empty() {
        return Err(LifecycleError::SchemaMismatch {
            scope: scope.to_string(),
            missing,
        });
    }
    let indices: Vec<usize> = expected
        .columns
        .iter()
        .filter_map(|c| table.schema.index_of(c))
        .collect();
    Ok(table
        .rows
        .iter()
        .map(|row| indices.iter().map(|&i| row.values[i]).collect())
        .collect())
}

fn mean(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

fn sample_std(window: &VecDeque<f64>) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let m = mean(window);
    let sum_sq: f64 = window.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (window.len() - 1) as f64).sqrt()
}

fn power_factor(active: f64, reactive: f64) -> f64 {
    let denom = (active * active + reactive * reactive).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    active / denom
}
