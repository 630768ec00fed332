//! Service configuration
//!
//! All settings come from the environment with the `RUL_` prefix, read once
//! at process start and immutable afterwards. When no buckets are
//! configured the service falls back to a local filesystem store, which is
//! the development setup.

use anyhow::Result;
use serde::Deserialize;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// API server port for predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// AWS region for the object store
    #[serde(default)]
    pub aws_region: Option<String>,

    /// Bucket holding raw sensor blobs; unset means local filesystem
    #[serde(default)]
    pub data_bucket: Option<String>,

    /// Bucket holding model artifacts; unset means local filesystem
    #[serde(default)]
    pub model_bucket: Option<String>,

    /// Key prefix raw sensor blobs live under
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,

    /// Root directory for the local filesystem store fallback
    #[serde(default = "default_local_store_path")]
    pub local_store_path: String,

    /// Row floor below which training refuses to run
    #[serde(default = "default_min_training_rows")]
    pub min_training_rows: usize,

    /// Distinct days of data required before a retrain cycle may proceed
    #[serde(default = "default_sufficiency_min_days")]
    pub sufficiency_min_days: usize,

    /// Lookback window for the scheduled daily retrain, in days
    #[serde(default = "default_retrain_lookback_days")]
    pub retrain_lookback_days: u32,

    /// Recent-data window consulted for each prediction, in days
    #[serde(default = "default_inference_lookback_days")]
    pub inference_lookback_days: u32,

    /// Hour of day (UTC) the scheduled retrain fires
    #[serde(default = "default_retrain_hour_utc")]
    pub retrain_hour_utc: u32,
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_prefix() -> String {
    "data".to_string()
}

fn default_local_store_path() -> String {
    "/var/lib/rul-service/store".to_string()
}

fn default_min_training_rows() -> usize {
    300
}

fn default_sufficiency_min_days() -> usize {
    21
}

fn default_retrain_lookback_days() -> u32 {
    21
}

fn default_inference_lookback_days() -> u32 {
    1
}

fn default_retrain_hour_utc() -> u32 {
    0
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            aws_region: None,
            data_bucket: None,
            model_bucket: None,
            data_prefix: default_data_prefix(),
            local_store_path: default_local_store_path(),
            min_training_rows: default_min_training_rows(),
            sufficiency_min_days: default_sufficiency_min_days(),
            retrain_lookback_days: default_retrain_lookback_days(),
            inference_lookback_days: default_inference_lookback_days(),
            retrain_hour_utc: default_retrain_hour_utc(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("RUL"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let config = ServiceConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.min_training_rows, 300);
        assert_eq!(config.sufficiency_min_days, 21);
        assert_eq!(config.retrain_lookback_days, 21);
        assert_eq!(config.inference_lookback_days, 1);
        assert!(config.data_bucket.is_none());
    }
}
