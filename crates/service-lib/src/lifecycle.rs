//! Lifecycle orchestrator
//!
//! Composition root exposing the two entry points the HTTP layer and the
//! scheduler consume: `predict` (cache + loader + transform) and `retrain`
//! (gate + engine). Trigger-agnostic; a manual CLI call and the daily job
//! reduce to the same methods.

use crate::dataset::DatasetLoader;
use crate::error::{LifecycleError, Result};
use crate::features::{project_rows, to_wide};
use crate::models::{EquipmentScope, RulPrediction, SufficiencyVerdict, TimeRange};
use crate::predictor::{CacheStats, ModelCache, Regressor};
use crate::sufficiency::SufficiencyGate;
use crate::training::{PublishedModel, RetrainEngine};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

/// Outcome of one retrain cycle
#[derive(Debug, Clone)]
pub enum RetrainOutcome {
    Published(PublishedModel),
    /// The sufficiency gate refused the cycle; must be reported, never
    /// silently dropped
    Skipped(SufficiencyVerdict),
}

/// Owns the lifecycle components and wires them into the two entry points
pub struct ModelLifecycle {
    loader: DatasetLoader,
    cache: Arc<ModelCache>,
    engine: RetrainEngine,
    gate: SufficiencyGate,
    inference_lookback_days: u32,
}

impl ModelLifecycle {
    pub fn new(
        loader: DatasetLoader,
        cache: ModelCache,
        engine: RetrainEngine,
        gate: SufficiencyGate,
        inference_lookback_days: u32,
    ) -> Self {
        Self {
            loader,
            cache: Arc::new(cache),
            engine,
            gate,
            inference_lookback_days: inference_lookback_days.max(1),
        }
    }

    /// Predict RUL for one equipment from its most recent telemetry
    pub async fn predict(&self, zone_id: &str, equipment_id: &str) -> Result<RulPrediction> {
        self.predict_at(zone_id, equipment_id, Utc::now().date_naive())
            .await
    }

    /// As [`predict`](Self::predict), with an explicit reference date for
    /// the recent-data window
    pub async fn predict_at(
        &self,
        zone_id: &str,
        equipment_id: &str,
        today: NaiveDate,
    ) -> Result<RulPrediction> {
        let model = self.cache.get_model().await?;

        let scope = EquipmentScope::equipment(zone_id, equipment_id);
        let window = TimeRange::lookback(today, self.inference_lookback_days);
        let records = self.loader.load(&scope, &window).await?;
        if records.is_empty() {
            return Err(LifecycleError::InsufficientData { rows: 0, floor: 1 });
        }

        let table = to_wide(&records);
        if table.is_empty() {
            return Err(LifecycleError::InsufficientData { rows: 0, floor: 1 });
        }
        let scope_name = format!("{zone_id}/{equipment_id}");
        let projected = project_rows(&table, &model.artifact.schema, &scope_name)?;

        // Score the newest row; rows are sorted by (equipment, hour)
        let newest = projected.len() - 1;
        let estimate = model.artifact.model.predict(&projected[newest]).max(0.0);
        let observed_at = table.rows[newest].timestamp;
        info!(
            zone_id,
            equipment_id,
            rul_estimate = estimate,
            model_version = %model.artifact.version,
            "prediction served"
        );

        Ok(RulPrediction {
            zone_id: zone_id.to_string(),
            equipment_id: equipment_id.to_string(),
            rul_estimate: estimate,
            model_version: model.artifact.version.clone(),
            observed_at,
        })
    }

    /// Run one retrain cycle: gate first, engine only on a pass
    pub async fn retrain(
        &self,
        scope: &EquipmentScope,
        window: &TimeRange,
        sample_limit: Option<usize>,
    ) -> Result<RetrainOutcome> {
        let verdict = self.gate.check(scope, window).await?;
        if !verdict.is_pass() {
            return Ok(RetrainOutcome::Skipped(verdict));
        }
        let published = self
            .engine
            .train_and_publish(scope, window, sample_limit)
            .await?;
        Ok(RetrainOutcome::Published(published))
    }

    /// Whether a model can currently be served; loads the cache if cold
    pub async fn model_ready(&self) -> bool {
        self.cache.get_model().await.is_ok()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
