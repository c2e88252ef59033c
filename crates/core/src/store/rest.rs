//! REST key-value store client (Upstash-style pipeline endpoint).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{DurableStore, StoreError};
use crate::config::StoreConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to a Redis-compatible REST endpoint: commands are posted as JSON
/// arrays to `/pipeline` and answered as `[{"result": ...}, ...]`.
pub struct RestKvStore {
    client: Client,
    config: StoreConfig,
}

impl RestKvStore {
    pub fn new(config: StoreConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    async fn pipeline(&self, commands: Vec<Vec<String>>) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/pipeline", self.config.url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&json!(commands))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    StoreError::ConnectionFailed(e.to_string())
                } else {
                    StoreError::ApiError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(StoreError::ApiError(format!(
                "HTTP {} from store",
                response.status()
            )));
        }

        let results: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        debug!(commands = results.len(), "store pipeline completed");
        Ok(results)
    }
}

#[async_trait]
impl DurableStore for RestKvStore {
    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let mut command = vec!["MGET".to_string()];
        command.extend(keys.iter().map(|k| k.to_string()));
        let results = self.pipeline(vec![command]).await?;

        let first = results
            .first()
            .ok_or_else(|| StoreError::Decode("empty pipeline response".to_string()))?;
        let values = first
            .get("result")
            .and_then(|v| v.as_array())
            .ok_or_else(|| StoreError::Decode("MGET result is not an array".to_string()))?;
        if values.len() != keys.len() {
            return Err(StoreError::Decode(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }
        Ok(values
            .iter()
            .map(|v| v.as_str().map(|s| s.to_string()))
            .collect())
    }

    async fn pipeline_set(&self, pairs: &[(String, String)]) -> Result<Vec<bool>, StoreError> {
        let commands: Vec<Vec<String>> = pairs
            .iter()
            .map(|(k, v)| vec!["SET".to_string(), k.clone(), v.clone()])
            .collect();
        let results = self.pipeline(commands).await?;
        if results.len() != pairs.len() {
            return Err(StoreError::Decode(format!(
                "pipeline returned {} results for {} commands",
                results.len(),
                pairs.len()
            )));
        }
        Ok(results
            .iter()
            .map(|r| r.get("result").and_then(|v| v.as_str()) == Some("OK"))
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let results = self.pipeline(vec![vec!["PING".to_string()]]).await?;
        let pong = results
            .first()
            .and_then(|r| r.get("result"))
            .and_then(|v| v.as_str())
            == Some("PONG");
        if pong {
            Ok(())
        } else {
            Err(StoreError::ApiError("unexpected PING reply".to_string()))
        }
    }
}
