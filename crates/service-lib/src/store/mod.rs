//! Remote object store client
//!
//! This module provides:
//! - A thin wrapper over `object_store` backends (S3, local filesystem,
//!   in-memory) with the lifecycle error taxonomy applied
//! - Content fingerprints for cheap change detection without payload
//!   transfer
//! - Key layout helpers for raw sensor blobs and versioned model artifacts

mod layout;

pub use layout::{
    metrics_key, parse_blob_date, raw_blob_key, raw_data_prefix, version_key, LATEST_MODEL_KEY,
    MODEL_PREFIX,
};

use crate::error::{LifecycleError, Result};
use crate::models::{EquipmentScope, TimeRange};
use bytes::Bytes;
use chrono::NaiveDate;
use object_store::path::Path as StorePath;
use object_store::{GetOptions, ObjectStore, PutPayload};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::debug;

/// Opaque content-derived token for change detection on a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a conditional read
#[derive(Debug)]
pub enum Conditional {
    /// The object changed since the known fingerprint
    Changed {
        bytes: Bytes,
        fingerprint: Fingerprint,
    },
    /// The object still matches the known fingerprint; no payload returned
    NotModified,
}

/// Durable key/value blob store keyed by hierarchical paths.
///
/// Wraps any `object_store` backend; one client per bucket.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<dyn ObjectStore>,
}

impl StoreClient {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// In-memory store, for tests and local experiments
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()))
    }

    /// Fetch an object and its fingerprint
    pub async fn get(&self, key: &str) -> Result<(Bytes, Fingerprint)> {
        let path = StorePath::from(key);
        let result = self
            .inner
            .get(&path)
            .await
            .map_err(|e| LifecycleError::from_store(key, e))?;
        let etag = result.meta.e_tag.clone();
        let bytes = result
            .bytes()
            .await
            .map_err(|e| LifecycleError::from_store(key, e))?;
        let fingerprint = fingerprint_of(etag, &bytes);
        Ok((bytes, fingerprint))
    }

    /// Conditional fetch: transfers the payload only when the object no
    /// longer matches `known`.
    ///
    /// Uses an `If-None-Match` read where the backend supports it, and
    /// additionally compares fingerprints locally so etag-less backends
    /// still report `NotModified` for unchanged content.
    pub async fn get_if_changed(&self, key: &str, known: &Fingerprint) -> Result<Conditional> {
        let path = StorePath::from(key);
        let options = GetOptions {
            if_none_match: Some(known.as_str().to_string()),
            ..Default::default()
        };
        let result = match self.inner.get_opts(&path, options).await {
            Ok(result) => result,
            Err(object_store::Error::NotModified { .. }) => {
                debug!(key, "store object unchanged");
                return Ok(Conditional::NotModified);
            }
            Err(e) => return Err(LifecycleError::from_store(key, e)),
        };
        let etag = result.meta.e_tag.clone();
        let bytes = result
            .bytes()
            .await
            .map_err(|e| LifecycleError::from_store(key, e))?;
        let fingerprint = fingerprint_of(etag, &bytes);
        if fingerprint == *known {
            return Ok(Conditional::NotModified);
        }
        Ok(Conditional::Changed { bytes, fingerprint })
    }

    /// Write an object, returning the fingerprint of the stored content
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<Fingerprint> {
        let path = StorePath::from(key);
        let result = self
            .inner
            .put(&path, PutPayload::from(bytes.clone()))
            .await
            .map_err(|e| LifecycleError::from_store(key, e))?;
        Ok(fingerprint_of(result.e_tag, &bytes))
    }

    /// Server-side copy; overwrites the destination if present
    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.inner
            .copy(&StorePath::from(from), &StorePath::from(to))
            .await
            .map_err(|e| LifecycleError::from_store(from, e))
    }

    /// List all keys under a prefix, sorted lexicographically
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let path = StorePath::from(prefix);
        let mut stream = self.inner.list(Some(&path));
        let mut keys = Vec::new();
        while let Some(item) = stream.next().await {
            let meta = item.map_err(|e| LifecycleError::from_store(prefix, e))?;
            keys.push(meta.location.to_string());
        }
        keys.sort();
        Ok(keys)
    }

    /// Distinct calendar days within `range` that have at least one raw blob
    /// under the scope's prefix. List-only; no payload transfer.
    pub async fn observed_days(
        &self,
        data_prefix: &str,
        scope: &EquipmentScope,
        range: &TimeRange,
    ) -> Result<BTreeSet<NaiveDate>> {
        let prefix = raw_data_prefix(data_prefix, scope);
        let keys = self.list(&prefix).await?;
        Ok(keys
            .iter()
            .filter_map(|key| parse_blob_date(key))
            .filter(|date| range.contains(*date))
            .collect())
    }
}

/// Prefer the store's entity tag; fall back to a SHA-256 of the payload
fn fingerprint_of(etag: Option<String>, bytes: &Bytes) -> Fingerprint {
    match etag {
        Some(tag) if !tag.is_empty() => Fingerprint(tag),
        _ => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            Fingerprint(hex::encode(hasher.finalize()))
        }
    }
}

/// SHA-256 hex digest, recorded beside published artifacts
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_is_not_found() {
        let store = StoreClient::in_memory();
        let err = store.get("models/latest/model.bin").await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let store = StoreClient::in_memory();
        let fp = store
            .put("data/z1/e1/2025/06/01/a.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        let (bytes, got_fp) = store.get("data/z1/e1/2025/06/01/a.json").await.unwrap();
        assert_eq!(&bytes[..], b"{}");
        assert_eq!(fp, got_fp);
    }

    #[tokio::test]
    async fn test_conditional_get_detects_change() {
        let store = StoreClient::in_memory();
        store
            .put("models/latest/model.bin", Bytes::from_static(b"one"))
            .await
            .unwrap();
        let (_, fp) = store.get("models/latest/model.bin").await.unwrap();

        let unchanged = store
            .get_if_changed("models/latest/model.bin", &fp)
            .await
            .unwrap();
        assert!(matches!(unchanged, Conditional::NotModified));

        store
            .put("models/latest/model.bin", Bytes::from_static(b"two"))
            .await
            .unwrap();
        let changed = store
            .get_if_changed("models/latest/model.bin", &fp)
            .await
            .unwrap();
        match changed {
            Conditional::Changed { bytes, fingerprint } => {
                assert_eq!(&bytes[..], b"two");
                assert_ne!(fingerprint, fp);
            }
            Conditional::NotModified => panic!("expected changed payload"),
        }
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let store = StoreClient::in_memory();
        for key in ["data/b.json", "data/c.json", "data/a.json"] {
            store.put(key, Bytes::from_static(b"{}")).await.unwrap();
        }
        let keys = store.list("data").await.unwrap();
        assert_eq!(keys, vec!["data/a.json", "data/b.json", "data/c.json"]);
    }

    #[tokio::test]
    async fn test_copy_overwrites_destination() {
        let store = StoreClient::in_memory();
        store
            .put("models/v1/model.bin", Bytes::from_static(b"new"))
            .await
            .unwrap();
        store
            .put("models/latest/model.bin", Bytes::from_static(b"old"))
            .await
            .unwrap();
        store
            .copy("models/v1/model.bin", "models/latest/model.bin")
            .await
            .unwrap();
        let (bytes, _) = store.get("models/latest/model.bin").await.unwrap();
        assert_eq!(&bytes[..], b"new");
    }

    #[tokio::test]
    async fn test_local_filesystem_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreClient::new(Arc::new(
            object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap(),
        ));

        store
            .put("models/latest/model.bin", Bytes::from_static(b"artifact"))
            .await
            .unwrap();
        let (bytes, fp) = store.get("models/latest/model.bin").await.unwrap();
        assert_eq!(&bytes[..], b"artifact");

        let unchanged = store
            .get_if_changed("models/latest/model.bin", &fp)
            .await
            .unwrap();
        assert!(matches!(unchanged, Conditional::NotModified));
    }

    #[test]
    fn test_checksum_is_stable_hex() {
        let a = checksum(b"artifact");
        let b = checksum(b"artifact");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
