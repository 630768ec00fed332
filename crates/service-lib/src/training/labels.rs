//! RUL labeling from alert thresholds
//!
//! An hour is faulty when at least two channel readings fall outside their
//! alert band. The label for every row is the number of hours until that
//! equipment's next faulty hour, capped at [`MAX_RUL_HOURS`]; rows with no
//! later fault carry the cap.

use crate::features::canonical_channel;
use crate::models::{FeatureTable, SensorRecord};
use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;

/// Per-channel (low, high) alert bands, tuned from field experience
pub const ALERT_THRESHOLDS: [(&str, f64, f64); 6] = [
    ("active_power", 0.0, 168_026.0),
    ("humidity", 14.5, 85.54),
    ("pressure", 4.6, 66.88),
    ("reactive_power", 0.0, 86_759.0),
    ("temperature", 41.0, 101.0),
    ("vibration", -0.5, 3.80),
];

/// Alerts within one hour that mark the hour faulty
pub const FAULT_ALERT_COUNT: usize = 2;

/// Label cap for healthy equipment, in hours
pub const MAX_RUL_HOURS: f64 = 30.0;

fn alert_band(channel: &str) -> Option<(f64, f64)> {
    ALERT_THRESHOLDS
        .iter()
        .find(|(name, _, _)| *name == channel)
        .map(|(_, lo, hi)| (*lo, *hi))
}

fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(ts.hour(), 0, 0)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or(ts)
}

/// Attach an RUL label to every row of `table`, derived from the raw
/// records the table was built from.
pub fn assign_rul_labels(table: &mut FeatureTable, records: &[SensorRecord]) {
    // (equipment, hour) -> out-of-band reading count
    let mut alerts: HashMap<(String, DateTime<Utc>), usize> = HashMap::new();
    for record in records {
        let Some(channel) = canonical_channel(&record.channel) else {
            continue;
        };
        let Some((lo, hi)) = alert_band(channel) else {
            continue;
        };
        if record.value < lo || record.value > hi {
            *alerts
                .entry((record.equipment_id.clone(), floor_to_hour(record.timestamp)))
                .or_insert(0) += 1;
        }
    }

    let faulty = |equipment: &str, hour: DateTime<Utc>| {
        alerts
            .get(&(equipment.to_string(), hour))
            .map(|count| *count >= FAULT_ALERT_COUNT)
            .unwrap_or(false)
    };

    // Rows are sorted by (equipment, hour); walk each equipment's run
    // backwards counting hours to the next fault.
    let mut start = 0;
    while start < table.rows.len() {
        let equipment = table.rows[start].equipment_id.clone();
        let mut end = start;
        while end < table.rows.len() && table.rows[end].equipment_id == equipment {
            end += 1;
        }

        let mut distance: Option<f64> = None;
        for row in table.rows[start..end].iter_mut().rev() {
            if faulty(&equipment, row.timestamp) {
                distance = Some(0.0);
            } else {
                distance = distance.map(|d| d + 1.0);
            }
            row.label = Some(distance.unwrap_or(MAX_RUL_HOURS).min(MAX_RUL_HOURS));
        }
        start = end;
    }
}
