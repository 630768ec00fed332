//! API client for the lifecycle service

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// HTTP client for the service's v1 API
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub zone_id: String,
    pub equipment_id: String,
    pub rul_estimate: f64,
    pub model_version: String,
    pub observed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// One retrain outcome: published, or skipped by the sufficiency gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainOutcome {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TrainingMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_days: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_days: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub components: std::collections::HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_parses_prediction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/predict?zone_id=Z1&equipment_id=E1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"zone_id":"Z1","equipment_id":"E1","rul_estimate":17.5,
                    "model_version":"v20250615010203004",
                    "observed_at":"2025-06-15T09:00:00Z"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let prediction: Prediction = client
            .get("api/v1/predict?zone_id=Z1&equipment_id=E1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(prediction.rul_estimate, 17.5);
        assert_eq!(prediction.model_version, "v20250615010203004");
    }

    #[tokio::test]
    async fn test_post_sends_retrain_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/retrain")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "month": "2025-06",
                "sample_limit": 500
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"published","version":"v1","trained_rows":480}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let outcome: RetrainOutcome = client
            .post(
                "api/v1/retrain",
                &RetrainRequest {
                    month: Some("2025-06".to_string()),
                    sample_limit: Some(500),
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.status, "published");
        assert_eq!(outcome.trained_rows, Some(480));
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/predict?zone_id=Z1&equipment_id=E1")
            .with_status(503)
            .with_body(r#"{"error":"no usable model: cold start"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .get::<Prediction>("api/v1/predict?zone_id=Z1&equipment_id=E1")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("no usable model"));
    }

    #[tokio::test]
    async fn test_skipped_outcome_parses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/retrain")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"skipped","observed_days":20,"required_days":21}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let outcome: RetrainOutcome = client
            .post(
                "api/v1/retrain",
                &RetrainRequest {
                    month: None,
                    sample_limit: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, "skipped");
        assert_eq!(outcome.observed_days, Some(20));
        assert_eq!(outcome.required_days, Some(21));
        assert!(outcome.version.is_none());
    }
}
