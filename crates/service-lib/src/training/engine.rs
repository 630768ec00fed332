//! Retraining engine
//!
//! Orchestrates one retrain as a hard step sequence: load, transform,
//! label and balance, fit, serialize, write the new version, promote.
//! Steps before the first store write are local and fail fast; a failed
//! version write leaves the store untouched; a failed promotion leaves the
//! previous latest pointer intact and at most one orphaned version behind.
//! Nothing is retried internally; retry policy belongs to the caller.

use crate::dataset::DatasetLoader;
use crate::error::{LifecycleError, Result};
use crate::features::to_wide;
use crate::models::{
    version_for, EquipmentScope, FeatureSchema, ModelArtifact, TimeRange, TrainingMetrics,
};
use crate::predictor::{GbdtParams, GbdtTrainer, Regressor};
use crate::store::{checksum, metrics_key, version_key, StoreClient, LATEST_MODEL_KEY};
use crate::training::{assign_rul_labels, balance_indices};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Every fifth balanced row is held out for evaluation
const HOLDOUT_STRIDE: usize = 5;

/// Result of a successful retrain
#[derive(Debug, Clone)]
pub struct PublishedModel {
    pub version: String,
    pub trained_rows: usize,
    pub schema: FeatureSchema,
    pub metrics: TrainingMetrics,
}

/// Evaluation summary written beside each versioned artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetricsRecord {
    pub version: String,
    pub window: TimeRange,
    pub trained_rows: usize,
    pub metrics: TrainingMetrics,
    /// SHA-256 of the serialized artifact, for corruption checks
    pub artifact_checksum: String,
}

/// Trains a candidate model and publishes it through the versioned store
/// layout. Holds no shared in-process state; the transaction is expressed
/// purely through store write ordering.
#[derive(Clone)]
pub struct RetrainEngine {
    store: StoreClient,
    loader: DatasetLoader,
    params: GbdtParams,
    min_training_rows: usize,
}

impl RetrainEngine {
    pub fn new(
        store: StoreClient,
        loader: DatasetLoader,
        params: GbdtParams,
        min_training_rows: usize,
    ) -> Self {
        Self {
            store,
            loader,
            params,
            min_training_rows,
        }
    }

    /// Train on the scope/window and promote the result to latest.
    ///
    /// `sample_limit` caps the balanced row count for quick runs.
    pub async fn train_and_publish(
        &self,
        scope: &EquipmentScope,
        window: &TimeRange,
        sample_limit: Option<usize>,
    ) -> Result<PublishedModel> {
        // 1-2. Load and pivot; the row floor is the authoritative guard
        let records = self.loader.load(scope, window).await?;
        let mut table = to_wide(&records);
        if table.rows.len() < self.min_training_rows {
            return Err(LifecycleError::InsufficientData {
                rows: table.rows.len(),
                floor: self.min_training_rows,
            });
        }

        // 3. Label and balance
        assign_rul_labels(&mut table, &records);
        let labels: Vec<f64> = table
            .rows
            .iter()
            .map(|row| row.label.unwrap_or_default())
            .collect();
        let balanced = balance_indices(&labels, sample_limit);
        if balanced.is_empty() {
            return Err(LifecycleError::InsufficientData {
                rows: 0,
                floor: self.min_training_rows,
            });
        }

        // 4. Fit on the training portion, evaluate on the holdout
        let mut train_rows = Vec::new();
        let mut train_targets = Vec::new();
        let mut holdout_rows = Vec::new();
        let mut holdout_targets = Vec::new();
        for (position, &idx) in balanced.iter().enumerate() {
            if position % HOLDOUT_STRIDE == HOLDOUT_STRIDE - 1 {
                holdout_rows.push(table.rows[idx].values.clone());
                holdout_targets.push(labels[idx]);
            } else {
                train_rows.push(table.rows[idx].values.clone());
                train_targets.push(labels[idx]);
            }
        }
        info!(
            %scope,
            %window,
            train_rows = train_rows.len(),
            holdout_rows = holdout_rows.len(),
            "fitting regressor"
        );
        let model = GbdtTrainer::new(self.params.clone()).fit(&train_rows, &train_targets);
        let metrics = if holdout_rows.is_empty() {
            evaluate(&model, &train_rows, &train_targets)
        } else {
            evaluate(&model, &holdout_rows, &holdout_targets)
        };

        // 5. Serialize the artifact
        let artifact = ModelArtifact {
            version: version_for(Utc::now()),
            schema: table.schema.clone(),
            window: *window,
            trained_rows: train_rows.len(),
            metrics,
            model,
        };
        let payload = serialize(&artifact, &version_key(&artifact.version))?;

        // 6. Durability point: the versioned artifact and its metrics
        // record exist before promotion is attempted
        let artifact_key = version_key(&artifact.version);
        self.store.put(&artifact_key, payload.clone()).await?;
        let record = ModelMetricsRecord {
            version: artifact.version.clone(),
            window: *window,
            trained_rows: artifact.trained_rows,
            metrics,
            artifact_checksum: checksum(&payload),
        };
        let record_key = metrics_key(&artifact.version);
        self.store
            .put(&record_key, serialize(&record, &record_key)?)
            .await?;

        // 7. Promotion: the sole mutation of the latest pointer, last
        self.store.copy(&artifact_key, LATEST_MODEL_KEY).await?;
        info!(
            version = %artifact.version,
            rows = artifact.trained_rows,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "model published and promoted"
        );

        Ok(PublishedModel {
            version: artifact.version,
            trained_rows: artifact.trained_rows,
            schema: artifact.schema,
            metrics,
        })
    }
}

fn serialize<T: Serialize>(value: &T, key: &str) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| LifecycleError::DataCorrupt {
            key: key.to_string(),
            message: format!("serialization failed: {e}"),
        })
}

fn evaluate(model: &impl Regressor, rows: &[Vec<f64>], targets: &[f64]) -> TrainingMetrics {
    if targets.is_empty() {
        return TrainingMetrics {
            rmse: 0.0,
            mae: 0.0,
            r2: 0.0,
        };
    }
    let n = targets.len() as f64;
    let predictions: Vec<f64> = rows.iter().map(|r| model.predict(r)).collect();
    let mse: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y).powi(2))
        .sum::<f64>()
        / n;
    let mae: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y).abs())
        .sum::<f64>()
        / n;
    let mean = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|y| (y - mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - (mse * n) / ss_tot
    } else {
        0.0
    };
    TrainingMetrics {
        rmse: mse.sqrt(),
        mae,
        r2,
    }
}
