//! Object store key layout
//!
//! Raw sensor blobs:   `{data_prefix}/{zone}/{equipment}/{yyyy}/{mm}/{dd}/*.json`
//! Versioned models:   `models/{version}/model.bin` (+ `metrics.json`)
//! Latest pointer:     `models/latest/model.bin`, a copy of the promoted
//! versioned object, never a mutable patch of it.

use crate::models::EquipmentScope;
use chrono::NaiveDate;

/// Prefix all model objects live under
pub const MODEL_PREFIX: &str = "models";

/// The key that always resolves to the currently promoted model
pub const LATEST_MODEL_KEY: &str = "models/latest/model.bin";

/// Key of a versioned, immutable model artifact
pub fn version_key(version: &str) -> String {
    format!("{MODEL_PREFIX}/{version}/model.bin")
}

/// Key of the evaluation summary written beside a versioned artifact
pub fn metrics_key(version: &str) -> String {
    format!("{MODEL_PREFIX}/{version}/metrics.json")
}

/// Raw-data listing prefix for a scope
pub fn raw_data_prefix(data_prefix: &str, scope: &EquipmentScope) -> String {
    match scope {
        EquipmentScope::Fleet => data_prefix.to_string(),
        EquipmentScope::Zone { zone_id } => format!("{data_prefix}/{zone_id}"),
        EquipmentScope::Equipment {
            zone_id,
            equipment_id,
        } => format!("{data_prefix}/{zone_id}/{equipment_id}"),
    }
}

/// Extract the calendar date encoded in a raw blob key.
///
/// The date is the three path segments immediately before the file name,
/// which holds for every scope depth.
pub fn parse_blob_date(key: &str) -> Option<NaiveDate> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < 4 {
        return None;
    }
    let day = segments[segments.len() - 2].parse().ok()?;
    let month = segments[segments.len() - 3].parse().ok()?;
    let year = segments[segments.len() - 4].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Build the key for one raw blob, used by tests and ingestion fixtures
pub fn raw_blob_key(
    data_prefix: &str,
    zone_id: &str,
    equipment_id: &str,
    date: NaiveDate,
    file: &str,
) -> String {
    format!(
        "{data_prefix}/{zone_id}/{equipment_id}/{}/{file}",
        date.format("%Y/%m/%d")
    )
}
