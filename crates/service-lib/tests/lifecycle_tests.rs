//! End-to-end lifecycle properties over an in-memory store with fault
//! injection: promotion atomicity, cache staleness behavior, and reader
//! consistency under concurrent refreshes.

use bytes::Bytes;
use chrono::NaiveDate;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult,
};
use service_lib::dataset::DatasetLoader;
use service_lib::error::LifecycleError;
use service_lib::models::{EquipmentScope, ModelArtifact, TimeRange};
use service_lib::predictor::{GbdtParams, ModelCache};
use service_lib::store::{raw_blob_key, version_key, StoreClient, LATEST_MODEL_KEY};
use service_lib::training::RetrainEngine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory store with per-operation failure switches
#[derive(Debug, Default)]
struct FlakyStore {
    inner: InMemory,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    fail_copies: AtomicBool,
}

impl FlakyStore {
    fn injected() -> object_store::Error {
        object_store::Error::Generic {
            store: "flaky",
            source: "injected failure".into(),
        }
    }
}

impl std::fmt::Display for FlakyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FlakyStore")
    }
}

#[async_trait::async_trait]
impl ObjectStore for FlakyStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&Path>,
    ) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

async fn seed_training_data(store: &StoreClient, days: u32) {
    for day in 1..=days {
        let date = NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        let mut lines = Vec::new();
        for hour in 0..10u32 {
            let faulty = day % 3 == 0 && hour == 5;
            for (channel, value) in [
                ("temperature", if faulty { 150.0 } else { 60.0 + hour as f64 }),
                ("vibration", if faulty { 9.0 } else { 0.5 }),
                ("pressure", 10.0 + day as f64 / 10.0),
            ] {
                lines.push(format!(
                    r#"{{"equipId":"E1","zoneId":"Z1","sensorType":"{channel}","time":"2025-06-{day:02}T{hour:02}:15:00Z","val":{value}}}"#
                ));
            }
        }
        store
            .put(
                &raw_blob_key("data", "Z1", "E1", date, "batch.json"),
                Bytes::from(lines.join("\n")),
            )
            .await
            .unwrap();
    }
}

fn engine_on(models: &StoreClient, data: &StoreClient) -> RetrainEngine {
    RetrainEngine::new(
        models.clone(),
        DatasetLoader::new(data.clone(), "data"),
        GbdtParams {
            trees: 10,
            ..GbdtParams::default()
        },
        30,
    )
}

async fn latest_version(models: &StoreClient) -> Option<String> {
    match models.get(LATEST_MODEL_KEY).await {
        Ok((bytes, _)) => {
            let artifact: ModelArtifact = serde_json::from_slice(&bytes).unwrap();
            Some(artifact.version)
        }
        Err(_) => None,
    }
}

fn june() -> TimeRange {
    TimeRange::parse_month("2025-06").unwrap()
}

fn e1() -> EquipmentScope {
    EquipmentScope::equipment("Z1", "E1")
}

#[tokio::test]
async fn test_failed_version_write_leaves_store_untouched() {
    let data = StoreClient::in_memory();
    seed_training_data(&data, 12).await;
    let flaky = Arc::new(FlakyStore::default());
    let models = StoreClient::new(flaky.clone());
    let engine = engine_on(&models, &data);

    flaky.fail_puts.store(true, Ordering::SeqCst);
    let err = engine
        .train_and_publish(&e1(), &june(), None)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    flaky.fail_puts.store(false, Ordering::SeqCst);
    assert!(models.list("models").await.unwrap().is_empty());
    assert_eq!(latest_version(&models).await, None);
}

#[tokio::test]
async fn test_failed_promotion_keeps_previous_latest() {
    let data = StoreClient::in_memory();
    seed_training_data(&data, 12).await;
    let flaky = Arc::new(FlakyStore::default());
    let models = StoreClient::new(flaky.clone());
    let engine = engine_on(&models, &data);

    let first = engine.train_and_publish(&e1(), &june(), None).await.unwrap();
    assert_eq!(latest_version(&models).await, Some(first.version.clone()));

    flaky.fail_copies.store(true, Ordering::SeqCst);
    let err = engine
        .train_and_publish(&e1(), &june(), None)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    flaky.fail_copies.store(false, Ordering::SeqCst);

    // Previous pointer untouched; the orphaned candidate version remains
    // durable and unreferenced
    assert_eq!(latest_version(&models).await, Some(first.version.clone()));
    let orphans = models.list("models").await.unwrap();
    let versioned: Vec<&String> = orphans
        .iter()
        .filter(|k| !k.starts_with("models/latest") && k.ends_with("model.bin"))
        .collect();
    assert!(versioned.len() >= 2);
}

#[tokio::test]
async fn test_aborted_retrain_after_empty_load_changes_nothing() {
    let data = StoreClient::in_memory();
    seed_training_data(&data, 12).await;
    let models = StoreClient::in_memory();
    let engine = engine_on(&models, &data);

    let first = engine.train_and_publish(&e1(), &june(), None).await.unwrap();

    // Empty window loads an empty record set (not an error), then training
    // refuses it
    let empty_window = TimeRange::parse_month("2025-09").unwrap();
    let loader = DatasetLoader::new(data.clone(), "data");
    let records = loader.load(&e1(), &empty_window).await.unwrap();
    assert!(records.is_empty());

    let err = engine
        .train_and_publish(&e1(), &empty_window, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InsufficientData { .. }));
    assert_eq!(latest_version(&models).await, Some(first.version));
}

#[tokio::test]
async fn test_cache_serves_stale_model_through_outage() {
    let data = StoreClient::in_memory();
    seed_training_data(&data, 12).await;
    let flaky = Arc::new(FlakyStore::default());
    let models = StoreClient::new(flaky.clone());
    let engine = engine_on(&models, &data);
    let published = engine.train_and_publish(&e1(), &june(), None).await.unwrap();

    let cache = ModelCache::new(models.clone());
    let loaded = cache.get_model().await.unwrap();
    assert_eq!(loaded.artifact.version, published.version);

    // Outage: refresh checks fail, the cached model keeps serving
    flaky.fail_gets.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        let served = cache.get_model().await.unwrap();
        assert_eq!(served.artifact.version, published.version);
    }
    let stats = cache.stats().await;
    assert_eq!(stats.refresh_failures, 3);
    assert_eq!(stats.deserializations, 1);

    // Recovery: the next check works again
    flaky.fail_gets.store(false, Ordering::SeqCst);
    let second = engine.train_and_publish(&e1(), &june(), None).await.unwrap();
    let refreshed = cache.get_model().await.unwrap();
    assert_eq!(refreshed.artifact.version, second.version);
}

#[tokio::test]
async fn test_cold_cache_fails_during_outage() {
    let flaky = Arc::new(FlakyStore::default());
    let models = StoreClient::new(flaky.clone());
    flaky.fail_gets.store(true, Ordering::SeqCst);

    let cache = ModelCache::new(models);
    let err = cache.get_model().await.unwrap_err();
    assert!(matches!(err, LifecycleError::ModelUnavailable { .. }));
}

#[tokio::test]
async fn test_concurrent_readers_observe_single_version_per_fingerprint() {
    let data = StoreClient::in_memory();
    seed_training_data(&data, 12).await;
    let models = StoreClient::in_memory();
    let engine = engine_on(&models, &data);
    engine.train_and_publish(&e1(), &june(), None).await.unwrap();

    let cache = Arc::new(ModelCache::new(models.clone()));
    let mut readers = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        readers.push(tokio::spawn(async move {
            let mut observed = Vec::new();
            for _ in 0..20 {
                let model = cache.get_model().await.unwrap();
                observed.push((
                    model.fingerprint.as_str().to_string(),
                    model.artifact.version.clone(),
                ));
                tokio::task::yield_now().await;
            }
            observed
        }));
    }

    // Publish two more versions while readers are in flight
    for _ in 0..2 {
        engine.train_and_publish(&e1(), &june(), None).await.unwrap();
    }

    let mut fingerprint_to_version: HashMap<String, String> = HashMap::new();
    for reader in readers {
        for (fingerprint, version) in reader.await.unwrap() {
            let entry = fingerprint_to_version
                .entry(fingerprint)
                .or_insert_with(|| version.clone());
            // A fingerprint never maps to two different versions
            assert_eq!(*entry, version);
        }
    }
    assert!(!fingerprint_to_version.is_empty());
}

#[tokio::test]
async fn test_promoted_artifact_is_byte_identical_to_version() {
    let data = StoreClient::in_memory();
    seed_training_data(&data, 12).await;
    let models = StoreClient::in_memory();
    let engine = engine_on(&models, &data);
    let published = engine.train_and_publish(&e1(), &june(), None).await.unwrap();

    let (versioned, _) = models.get(&version_key(&published.version)).await.unwrap();
    let (latest, _) = models.get(LATEST_MODEL_KEY).await.unwrap();
    assert_eq!(versioned, latest);
}
