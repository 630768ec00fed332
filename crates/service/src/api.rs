//! HTTP API: predictions, retrain trigger, health checks, metrics

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use service_lib::{
    health::ComponentStatus, EquipmentScope, HealthRegistry, LifecycleError, ModelLifecycle,
    RetrainOutcome, ServiceMetrics, StructuredLogger, TimeRange,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ModelLifecycle>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    /// Single-flight guard for retrain triggers; shared with the scheduler
    pub retrain_guard: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        lifecycle: Arc<ModelLifecycle>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        retrain_guard: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            lifecycle,
            health_registry,
            metrics,
            logger,
            retrain_guard,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub zone_id: String,
    pub equipment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RetrainRequest {
    /// Target month (`YYYY-MM`); defaults to the current UTC month
    #[serde(default)]
    pub month: Option<String>,
    /// Optional cap on balanced training rows for quick runs
    #[serde(default)]
    pub sample_limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// Map a lifecycle failure onto the HTTP surface
fn error_response(err: &LifecycleError) -> (StatusCode, Json<ErrorBody>) {
    let (status, kind) = match err {
        LifecycleError::ModelUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable"),
        LifecycleError::InsufficientData { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_data"),
        LifecycleError::SchemaMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "schema_mismatch"),
        LifecycleError::PermissionDenied { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "permission_denied"),
        LifecycleError::NotFound { .. } => (StatusCode::BAD_GATEWAY, "not_found"),
        LifecycleError::DataCorrupt { .. } => (StatusCode::BAD_GATEWAY, "data_corrupt"),
        LifecycleError::TransientIo { .. } => (StatusCode::BAD_GATEWAY, "transient_io"),
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
            kind,
        }),
    )
}

/// Health check - 200 while no component is hard-down
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

/// Readiness - 200 only once a model is loadable
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.health_registry.readiness().await.ready && state.lifecycle.model_ready().await {
        state.health_registry.set_ready(true).await;
    }
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Serve one RUL prediction
async fn predict(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PredictParams>,
) -> impl IntoResponse {
    let start = Instant::now();
    match state
        .lifecycle
        .predict(&params.zone_id, &params.equipment_id)
        .await
    {
        Ok(prediction) => {
            state.metrics.inc_predictions_served();
            state
                .metrics
                .observe_inference_latency(start.elapsed().as_secs_f64());
            state.metrics.set_model_version(&prediction.model_version);
            state.logger.log_prediction(
                &prediction.zone_id,
                &prediction.equipment_id,
                prediction.rul_estimate,
                &prediction.model_version,
            );
            (StatusCode::OK, Json(json!(prediction))).into_response()
        }
        Err(err) => {
            state.metrics.inc_prediction_errors();
            error_response(&err).into_response()
        }
    }
}

/// Trigger one retrain cycle; 409 when a cycle is already in flight
async fn retrain(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RetrainRequest>,
) -> impl IntoResponse {
    let Ok(_guard) = state.retrain_guard.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({"status": "busy", "error": "a retrain is already in flight"})),
        )
            .into_response();
    };

    let now = Utc::now();
    let month = request
        .month
        .unwrap_or_else(|| format!("{:04}-{:02}", now.year(), now.month()));
    let Some(window) = TimeRange::parse_month(&month) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "error": format!("invalid month '{month}'")})),
        )
            .into_response();
    };

    info!(month = %month, sample_limit = ?request.sample_limit, "manual retrain triggered");
    let start = Instant::now();
    match state
        .lifecycle
        .retrain(&EquipmentScope::Fleet, &window, request.sample_limit)
        .await
    {
        Ok(RetrainOutcome::Published(published)) => {
            state.metrics.inc_retrains_published();
            state
                .metrics
                .observe_retrain_duration(start.elapsed().as_secs_f64());
            state.metrics.set_last_training_rows(published.trained_rows as i64);
            state.logger.log_retrain_published(
                &published.version,
                published.trained_rows,
                published.metrics.rmse,
                published.metrics.r2,
            );
            (
                StatusCode::OK,
                Json(json!({
                    "status": "published",
                    "version": published.version,
                    "trained_rows": published.trained_rows,
                    "metrics": published.metrics,
                })),
            )
                .into_response()
        }
        Ok(RetrainOutcome::Skipped(verdict)) => {
            state.metrics.inc_retrains_skipped();
            state
                .logger
                .log_retrain_skipped(verdict.observed_days, verdict.required_days);
            (
                StatusCode::OK,
                Json(json!({
                    "status": "skipped",
                    "observed_days": verdict.observed_days,
                    "required_days": verdict.required_days,
                })),
            )
                .into_response()
        }
        Err(err) => {
            state.metrics.inc_retrain_errors();
            state.logger.log_retrain_failed(&err.to_string());
            error_response(&err).into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/predict", get(predict))
        .route("/api/v1/retrain", post(retrain))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
