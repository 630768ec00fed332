//! Equipment RUL lifecycle service
//!
//! This binary serves RUL predictions from the currently promoted model
//! and runs the daily retraining schedule against the object store.

use anyhow::{Context, Result};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use service_lib::dataset::DatasetLoader;
use service_lib::health::{components, HealthRegistry};
use service_lib::predictor::{GbdtParams, ModelCache};
use service_lib::store::StoreClient;
use service_lib::sufficiency::SufficiencyGate;
use service_lib::training::RetrainEngine;
use service_lib::{ModelLifecycle, ServiceMetrics, StructuredLogger};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod scheduler;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting rul-service");

    // Load configuration
    let config = config::ServiceConfig::load()?;
    info!(
        api_port = config.api_port,
        data_prefix = %config.data_prefix,
        "Service configured"
    );

    // One store client per bucket; local filesystem when no bucket is set
    let data_store = build_store(
        config.data_bucket.as_deref(),
        config.aws_region.as_deref(),
        &config.local_store_path,
        "sensor-data",
    )?;
    let model_store = build_store(
        config.model_bucket.as_deref(),
        config.aws_region.as_deref(),
        &config.local_store_path,
        "models",
    )?;

    // Wire the lifecycle components
    let loader = DatasetLoader::new(data_store, &config.data_prefix);
    let lifecycle = Arc::new(ModelLifecycle::new(
        loader.clone(),
        ModelCache::new(model_store.clone()),
        RetrainEngine::new(
            model_store,
            loader.clone(),
            GbdtParams::default(),
            config.min_training_rows,
        ),
        SufficiencyGate::new(loader, config.sufficiency_min_days),
        config.inference_lookback_days,
    ));

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::MODEL_CACHE).await;
    health_registry.register(components::RETRAINER).await;

    // Initialize metrics
    let metrics = ServiceMetrics::new();

    // Initialize structured logger
    let logger = StructuredLogger::new("rul-service");
    logger.log_startup(SERVICE_VERSION);

    // Ready only once a model is loadable; a cold start stays not-ready
    // until the first retrain promotes one
    if lifecycle.model_ready().await {
        health_registry.set_ready(true).await;
        if let Some(version) = lifecycle.cache_stats().await.model_version {
            metrics.set_model_version(&version);
            info!(version = %version, "Serving previously promoted model");
        }
    } else {
        info!("No promoted model yet, waiting for first retrain");
    }

    // The scheduler and the manual HTTP trigger share one single-flight
    // guard per process
    let retrain_guard = Arc::new(Mutex::new(()));

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        lifecycle.clone(),
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
        retrain_guard.clone(),
    ));

    // Start the daily retrain schedule
    let retrain_scheduler = scheduler::RetrainScheduler::new(
        lifecycle,
        metrics,
        logger.clone(),
        retrain_guard,
        config.retrain_lookback_days,
        config.retrain_hour_utc,
    );
    tokio::spawn(retrain_scheduler.run());

    // Start the API server
    tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}

/// S3 when a bucket is configured, local filesystem otherwise
fn build_store(
    bucket: Option<&str>,
    region: Option<&str>,
    local_root: &str,
    local_subdir: &str,
) -> Result<StoreClient> {
    match bucket {
        Some(bucket) => {
            let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
            if let Some(region) = region {
                builder = builder.with_region(region);
            }
            let store = builder
                .build()
                .with_context(|| format!("Failed to configure S3 store for bucket '{bucket}'"))?;
            Ok(StoreClient::new(Arc::new(store)))
        }
        None => {
            let root = std::path::Path::new(local_root).join(local_subdir);
            std::fs::create_dir_all(&root)
                .with_context(|| format!("Failed to create local store at {}", root.display()))?;
            let store = LocalFileSystem::new_with_prefix(&root)
                .with_context(|| format!("Failed to open local store at {}", root.display()))?;
            Ok(StoreClient::new(Arc::new(store)))
        }
    }
}
