use crate::errors::PipelineError;
use crate::models::CreditScoreRecord;
use failsafe::{backoff, failure_policy};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// Client for the per-customer credit-score HTTP service.
///
/// The service fails intermittently by design; callers are expected to
/// retry and, on exhaustion, degrade the record rather than abort.
#[derive(Clone)]
pub struct CreditScoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl CreditScoreClient {
    /// Creates a new `CreditScoreClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the credit-score service.
    /// * `timeout` - Per-call timeout applied to every request.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PipelineError::RemoteFetch(format!("Failed to create credit client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the credit-score record for a single customer.
    ///
    /// A non-success status or transport error is returned as
    /// `RemoteFetch`; the caller decides whether to retry or degrade.
    pub async fn fetch_score(&self, customer_id: &str) -> Result<CreditScoreRecord, PipelineError> {
        let url = format!("{}/credit-score/{}", self.base_url, customer_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            PipelineError::RemoteFetch(format!("Credit API request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::RemoteFetch(format!(
                "Credit API returned status {}: {}",
                status, error_text
            )));
        }

        let record: CreditScoreRecord = response.json().await.map_err(|e| {
            PipelineError::RemoteFetch(format!("Failed to parse credit API response: {}", e))
        })?;

        Ok(record)
    }

    /// Fetches credit-score records for many customers in one call via the
    /// service's batch endpoint (`POST /credit-scores`).
    ///
    /// The ingestion contract uses the single-record form; this exists for
    /// callers that can tolerate all-or-nothing semantics per batch.
    pub async fn fetch_scores_batch(
        &self,
        customer_ids: &[String],
    ) -> Result<HashMap<String, CreditScoreRecord>, PipelineError> {
        let url = format!("{}/credit-scores", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "customer_ids": customer_ids }))
            .send()
            .await
            .map_err(|e| {
                PipelineError::RemoteFetch(format!("Credit API batch request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::RemoteFetch(format!(
                "Credit API batch returned status {}: {}",
                status, error_text
            )));
        }

        let records: HashMap<String, CreditScoreRecord> = response.json().await.map_err(|e| {
            PipelineError::RemoteFetch(format!("Failed to parse credit API batch response: {}", e))
        })?;

        Ok(records)
    }
}

/// Creates a circuit breaker for the credit-score fetch loop.
///
/// Five consecutive failures open the circuit; recovery attempts back off
/// exponentially from 1s to 10s. While open, remaining fetches in the batch
/// fail fast instead of burning their timeout against a dead service.
pub fn create_credit_circuit() -> impl failsafe::futures::CircuitBreaker {
    let backoff_strategy =
        backoff::exponential(Duration::from_secs(1), Duration::from_secs(10));

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    failsafe::Config::new()
        .failure_policy(failure_policy)
        .build()
}
