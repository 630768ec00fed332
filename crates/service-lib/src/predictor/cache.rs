//! In-process cache of the promoted model
//!
//! Holds the deserialized artifact behind the latest pointer together with
//! the store fingerprint it was loaded from. Every call re-checks the
//! fingerprint with a conditional read; the payload is transferred and
//! deserialized only when the pointer actually moved. The cached pair is
//! swapped wholesale, so in-flight inferences keep scoring against the
//! model they started with.

use crate::error::{LifecycleError, Result};
use crate::models::ModelArtifact;
use crate::store::{Conditional, Fingerprint, StoreClient, LATEST_MODEL_KEY};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Deserialized artifact plus the fingerprint it was loaded from.
///
/// Replaced wholesale on refresh, never patched in place.
#[derive(Debug)]
pub struct CachedModel {
    pub artifact: ModelArtifact,
    pub fingerprint: Fingerprint,
}

/// Counters exposed for observability and tests
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub loaded: bool,
    pub model_version: Option<String>,
    pub deserializations: u64,
    pub refresh_failures: u64,
}

/// Two-state cache: Stale (nothing loaded yet) and Loaded.
///
/// The lock guards only the pointer swap; fetches and deserialization run
/// outside any mutual-exclusion region so a slow store call never blocks
/// readers of the currently cached model.
pub struct ModelCache {
    store: StoreClient,
    latest_key: String,
    current: RwLock<Option<Arc<CachedModel>>>,
    deserializations: AtomicU64,
    refresh_failures: AtomicU64,
}

impl ModelCache {
    pub fn new(store: StoreClient) -> Self {
        Self::with_key(store, LATEST_MODEL_KEY)
    }

    pub fn with_key(store: StoreClient, latest_key: impl Into<String>) -> Self {
        Self {
            store,
            latest_key: latest_key.into(),
            current: RwLock::new(None),
            deserializations: AtomicU64::new(0),
            refresh_failures: AtomicU64::new(0),
        }
    }

    /// Return the model behind the latest pointer, loading or refreshing as
    /// needed.
    ///
    /// While Loaded, a transient store failure downgrades to serving the
    /// stale-but-valid cached model; the next call attempts the change
    /// check again. While Stale, the same failure surfaces as
    /// `ModelUnavailable` since there is nothing to fall back to.
    pub async fn get_model(&self) -> Result<Arc<CachedModel>> {
        let cached = self.current.read().await.clone();
        match cached {
            None => self.cold_load().await,
            Some(current) => self.refresh(current).await,
        }
    }

    async fn cold_load(&self) -> Result<Arc<CachedModel>> {
        let (bytes, fingerprint) = match self.store.get(&self.latest_key).await {
            Ok(ok) => ok,
            Err(LifecycleError::NotFound { key }) => {
                return Err(LifecycleError::ModelUnavailable {
                    reason: format!("no model has been published at '{key}' yet"),
                })
            }
            Err(e) if e.is_retryable() => {
                return Err(LifecycleError::ModelUnavailable {
                    reason: format!("store unreachable before first model load: {e}"),
                })
            }
            Err(e) => return Err(e),
        };
        let loaded = Arc::new(CachedModel {
            artifact: self.deserialize(&bytes)?,
            fingerprint,
        });
        info!(
            version = %loaded.artifact.version,
            fingerprint = %loaded.fingerprint,
            "model loaded"
        );
        *self.current.write().await = Some(loaded.clone());
        Ok(loaded)
    }

    async fn refresh(&self, current: Arc<CachedModel>) -> Result<Arc<CachedModel>> {
        match self
            .store
            .get_if_changed(&self.latest_key, &current.fingerprint)
            .await
        {
            Ok(Conditional::NotModified) => Ok(current),
            Ok(Conditional::Changed { bytes, fingerprint }) => {
                let replacement = Arc::new(CachedModel {
                    artifact: self.deserialize(&bytes)?,
                    fingerprint,
                });
                info!(
                    old_version = %current.artifact.version,
                    new_version = %replacement.artifact.version,
                    "model refreshed"
                );
                *self.current.write().await = Some(replacement.clone());
                Ok(replacement)
            }
            Err(e) if e.is_retryable() => {
                self.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    version = %current.artifact.version,
                    "refresh check failed, serving cached model"
                );
                Ok(current)
            }
            Err(e) => Err(e),
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<ModelArtifact> {
        self.deserializations.fetch_add(1, Ordering::Relaxed);
        serde_json::from_slice(bytes).map_err(|e| LifecycleError::DataCorrupt {
            key: self.latest_key.clone(),
            message: e.to_string(),
        })
    }

    pub async fn stats(&self) -> CacheStats {
        let current = self.current.read().await;
        CacheStats {
            loaded: current.is_some(),
            model_version: current.as_ref().map(|m| m.artifact.version.clone()),
            deserializations: self.deserializations.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
        }
    }
}
