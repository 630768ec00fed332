//! Observability infrastructure for the lifecycle service
//!
//! Provides:
//! - Prometheus metrics (inference/retrain latency, model version, cache
//!   refresh failures, retrain outcomes)
//! - Structured JSON logging for lifecycle events via tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_gauge, GaugeVec, Histogram, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 60.0, 300.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    inference_latency_seconds: Histogram,
    retrain_duration_seconds: Histogram,
    model_version_info: GaugeVec,
    predictions_served: IntGauge,
    prediction_errors: IntGauge,
    retrains_published: IntGauge,
    retrains_skipped: IntGauge,
    retrain_errors: IntGauge,
    cache_refresh_failures: IntGauge,
    last_training_rows: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "rul_service_inference_latency_seconds",
                "Time spent serving one prediction, including data loading",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            retrain_duration_seconds: register_histogram!(
                "rul_service_retrain_duration_seconds",
                "Wall-clock duration of one retrain cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register retrain_duration_seconds"),

            model_version_info: register_gauge_vec!(
                "rul_service_model_version_info",
                "Information about the currently served model version",
                &["version"]
            )
            .expect("Failed to register model_version_info"),

            predictions_served: register_int_gauge!(
                "rul_service_predictions_served_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_served"),

            prediction_errors: register_int_gauge!(
                "rul_service_prediction_errors_total",
                "Total number of failed prediction requests"
            )
            .expect("Failed to register prediction_errors"),

            retrains_published: register_int_gauge!(
                "rul_service_retrains_published_total",
                "Total number of retrains that promoted a new model"
            )
            .expect("Failed to register retrains_published"),

            retrains_skipped: register_int_gauge!(
                "rul_service_retrains_skipped_total",
                "Total number of retrain cycles refused by the sufficiency gate"
            )
            .expect("Failed to register retrains_skipped"),

            retrain_errors: register_int_gauge!(
                "rul_service_retrain_errors_total",
                "Total number of retrain cycles that failed"
            )
            .expect("Failed to register retrain_errors"),

            cache_refresh_failures: register_int_gauge!(
                "rul_service_cache_refresh_failures_total",
                "Model cache refresh attempts that fell back to the cached model"
            )
            .expect("Failed to register cache_refresh_failures"),

            last_training_rows: register_int_gauge!(
                "rul_service_last_training_rows",
                "Balanced row count of the most recent successful training"
            )
            .expect("Failed to register last_training_rows"),
        }
    }
}

/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn observe_retrain_duration(&self, duration_secs: f64) {
        self.inner().retrain_duration_seconds.observe(duration_secs);
    }

    /// Record the served model version; resets the previous label set
    pub fn set_model_version(&self, version: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn inc_predictions_served(&self) {
        self.inner().predictions_served.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn inc_retrains_published(&self) {
        self.inner().retrains_published.inc();
    }

    pub fn inc_retrains_skipped(&self) {
        self.inner().retrains_skipped.inc();
    }

    pub fn inc_retrain_errors(&self) {
        self.inner().retrain_errors.inc();
    }

    pub fn set_cache_refresh_failures(&self, count: i64) {
        self.inner().cache_refresh_failures.set(count);
    }

    pub fn set_last_training_rows(&self, rows: i64) {
        self.inner().last_training_rows.set(rows);
    }
}

/// Structured logger for lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_prediction(
        &self,
        zone_id: &str,
        equipment_id: &str,
        rul_estimate: f64,
        model_version: &str,
    ) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            zone_id = %zone_id,
            equipment_id = %equipment_id,
            rul_estimate = rul_estimate,
            model_version = %model_version,
            "Served RUL prediction"
        );
    }

    pub fn log_retrain_published(&self, version: &str, trained_rows: usize, rmse: f64, r2: f64) {
        info!(
            event = "model_published",
            service = %self.service_name,
            version = %version,
            trained_rows = trained_rows,
            rmse = rmse,
            r2 = r2,
            "New model version promoted to latest"
        );
    }

    pub fn log_retrain_skipped(&self, observed_days: usize, required_days: usize) {
        warn!(
            event = "retrain_skipped",
            service = %self.service_name,
            observed_days = observed_days,
            required_days = required_days,
            "Sufficiency gate refused retrain cycle"
        );
    }

    pub fn log_retrain_failed(&self, error: &str) {
        warn!(
            event = "retrain_failed",
            service = %self.service_name,
            error = %error,
            "Retrain cycle failed"
        );
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            service_version = %version,
            "RUL lifecycle service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "RUL lifecycle service shutting down"
        );
    }
}
