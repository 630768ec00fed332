//! Error taxonomy for the model lifecycle core
//!
//! Every failure the core can surface is one of these kinds, carrying the
//! offending key or scope so callers can render a useful message and pick a
//! status/exit code. Only `TransientIo` is safe to retry blindly.

use thiserror::Error;

/// Result alias used throughout the core library
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Failure kinds surfaced by the lifecycle core
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Network or service hiccup talking to the object store; the whole
    /// operation may be retried by the caller
    #[error("transient store failure at '{key}': {message}")]
    TransientIo { key: String, message: String },

    /// The requested object does not exist
    #[error("object not found: '{key}'")]
    NotFound { key: String },

    /// Remote data exists but could not be decoded
    #[error("corrupt data at '{key}': {message}")]
    DataCorrupt { key: String, message: String },

    /// Credentials rejected by the store; operator intervention required
    #[error("permission denied accessing '{key}'")]
    PermissionDenied { key: String },

    /// Not enough rows to train; a policy rejection, not a bug
    #[error("insufficient data: {rows} rows below training floor of {floor}")]
    InsufficientData { rows: usize, floor: usize },

    /// Observed feature columns are incompatible with the expected schema
    #[error("schema mismatch for '{scope}': missing columns {missing:?}")]
    SchemaMismatch { scope: String, missing: Vec<String> },

    /// No usable model; the reason distinguishes cold start from an outage
    #[error("no usable model: {reason}")]
    ModelUnavailable { reason: String },
}

impl LifecycleError {
    /// Whether retrying the whole operation can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::TransientIo { .. })
    }

    /// Classify an `object_store` error against the taxonomy
    pub(crate) fn from_store(key: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => LifecycleError::NotFound {
                key: key.to_string(),
            },
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => LifecycleError::PermissionDenied {
                key: key.to_string(),
            },
            other => LifecycleError::TransientIo {
                key: key.to_string(),
                message: other.to_string(),
            },
        }
    }
}
