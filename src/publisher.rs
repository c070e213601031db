use crate::errors::PipelineError;
use std::time::Duration;

/// Uploads the published artifact to the external object store.
///
/// The store is an external collaborator; this client only defines the
/// boundary: PUT the file under `{base}/{bucket}/{key}` and report
/// success or failure. The caller decides the retry/alerting policy.
#[derive(Clone)]
pub struct ObjectStorePublisher {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl ObjectStorePublisher {
    /// Creates a new `ObjectStorePublisher`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the object store.
    /// * `bucket` - The bucket receiving published artifacts.
    /// * `timeout` - Timeout applied to every upload request.
    pub fn new(base_url: String, bucket: String, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PipelineError::Publish(format!("Failed to create object store client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket,
        })
    }

    /// Uploads a local file under the given key.
    pub async fn upload(&self, local_path: &str, key: &str) -> Result<(), PipelineError> {
        let body = tokio::fs::read(local_path).await.map_err(|e| {
            PipelineError::Publish(format!("Cannot read artifact {}: {}", local_path, e))
        })?;

        let url = format!("{}/{}/{}", self.base_url, self.bucket, key);
        tracing::info!("Uploading {} to {}", local_path, url);

        let response = self
            .client
            .put(&url)
            .header("Content-Type", "text/csv")
            .body(body)
            .send()
            .await
            .map_err(|e| PipelineError::Publish(format!("Object store request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Publish(format!(
                "Object store returned status {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publisher_creation() {
        let publisher = ObjectStorePublisher::new(
            "http://127.0.0.1:9000/".to_string(),
            "loan-risk-artifacts".to_string(),
            Duration::from_secs(30),
        );
        assert!(publisher.is_ok());
        assert_eq!(publisher.unwrap().base_url, "http://127.0.0.1:9000");
    }
}
