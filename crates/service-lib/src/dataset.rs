//! Dataset loading from raw sensor blobs
//!
//! Lists candidate blobs under a scope's key prefix, filters to the
//! requested time range, fetches and decodes each, and concatenates the
//! records in key order. Emptiness is not an error here; callers decide
//! whether an empty window matters.

use crate::error::{LifecycleError, Result};
use crate::models::{EquipmentScope, SensorRecord, TimeRange};
use crate::store::{parse_blob_date, raw_data_prefix, StoreClient};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Reads raw sensor telemetry for a scope and time range
#[derive(Clone)]
pub struct DatasetLoader {
    store: StoreClient,
    data_prefix: String,
}

impl DatasetLoader {
    pub fn new(store: StoreClient, data_prefix: impl Into<String>) -> Self {
        Self {
            store,
            data_prefix: data_prefix.into(),
        }
    }

    /// Load every record for the scope whose blob date falls inside `range`.
    ///
    /// Returns an empty vector when no blobs exist in range. Store failures
    /// propagate unchanged; malformed payloads surface as `DataCorrupt`
    /// naming the offending key.
    pub async fn load(
        &self,
        scope: &EquipmentScope,
        range: &TimeRange,
    ) -> Result<Vec<SensorRecord>> {
        let prefix = raw_data_prefix(&self.data_prefix, scope);
        let keys = self.store.list(&prefix).await?;
        let candidates: Vec<&String> = keys
            .iter()
            .filter(|key| key.ends_with(".json"))
            .filter(|key| parse_blob_date(key).is_some_and(|d| range.contains(d)))
            .collect();
        debug!(%scope, %range, candidates = candidates.len(), "listed raw blobs");

        let mut records = Vec::new();
        for key in candidates {
            let (bytes, _) = self.store.get(key).await?;
            decode_records(key, &bytes, &mut records)?;
        }
        info!(%scope, %range, rows = records.len(), "loaded sensor records");
        Ok(records)
    }

    /// Distinct calendar days with at least one blob for the scope in
    /// `range`. List-only; used by the sufficiency gate.
    pub async fn list_days(
        &self,
        scope: &EquipmentScope,
        range: &TimeRange,
    ) -> Result<BTreeSet<NaiveDate>> {
        self.store
            .observed_days(&self.data_prefix, scope, range)
            .await
    }
}

/// Decode one blob into `out`. NDJSON is the wire format; a payload opening
/// with `[` is accepted as a plain JSON array, which older ingesters wrote.
fn decode_records(key: &str, bytes: &[u8], out: &mut Vec<SensorRecord>) -> Result<()> {
    let text = std::str::from_utf8(bytes).map_err(|e| LifecycleError::DataCorrupt {
        key: key.to_string(),
        message: format!("not utf-8: {e}"),
    })?;
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let batch: Vec<SensorRecord> =
            serde_json::from_str(trimmed).map_err(|e| LifecycleError::DataCorrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        out.extend(batch);
        return Ok(());
    }
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: SensorRecord =
            serde_json::from_str(line).map_err(|e| LifecycleError::DataCorrupt {
                key: key.to_string(),
                message: format!("line {}: {e}", lineno + 1),
            })?;
        out.push(record);
    }
    Ok(())
}
