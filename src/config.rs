use serde::Deserialize;

/// Runtime configuration for one pipeline run.
///
/// Every field can be overridden through the environment; the defaults
/// reproduce the conventional local layout (`data/` directory next to the
/// binary, credit-score service on localhost).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the loan applications CSV.
    pub loans_csv_path: String,
    /// SQLite connection URL for the customer demographics table.
    pub database_url: String,
    /// Base URL of the credit-score HTTP service.
    pub credit_api_base_url: String,
    /// Path where the unified snapshot is written.
    pub unified_output_path: String,
    /// Path where the transformed dataset is written.
    pub transformed_output_path: String,
    /// Base URL of the object store receiving the published artifact.
    pub object_store_url: String,
    /// Bucket name under the object store.
    pub object_store_bucket: String,
    /// Object key for the published artifact.
    pub publish_key: String,
    /// Per-call timeout for credit-score fetches, in seconds.
    pub credit_fetch_timeout_secs: u64,
    /// Timeout for the object-store upload, in seconds.
    pub publish_timeout_secs: u64,
    /// Fixed worker count for the credit-score fetch pool.
    pub credit_fetch_workers: usize,
    /// Retries per credit-score fetch before degrading to null.
    pub credit_fetch_retries: u32,
    /// Validation gate threshold: halt before transformation when the
    /// issue count exceeds this. `None` means log and proceed anyway.
    pub max_validation_issues: Option<usize>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            loans_csv_path: env_or("LOANS_CSV_PATH", "data/loans.csv"),
            database_url: {
                let url = env_or("DATABASE_URL", "sqlite://data/customers.db");
                if !url.starts_with("sqlite:") {
                    anyhow::bail!("DATABASE_URL must be a sqlite:// URL");
                }
                url
            },
            credit_api_base_url: {
                let url = env_or("CREDIT_API_BASE_URL", "http://127.0.0.1:8000");
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("CREDIT_API_BASE_URL must start with http:// or https://");
                }
                url.trim_end_matches('/').to_string()
            },
            unified_output_path: env_or("UNIFIED_OUTPUT_PATH", "data/unified_dataset.csv"),
            transformed_output_path: env_or(
                "TRANSFORMED_OUTPUT_PATH",
                "data/transformed_dataset.csv",
            ),
            object_store_url: {
                let url = env_or("OBJECT_STORE_URL", "http://127.0.0.1:9000");
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("OBJECT_STORE_URL must start with http:// or https://");
                }
                url.trim_end_matches('/').to_string()
            },
            object_store_bucket: env_or("OBJECT_STORE_BUCKET", "loan-risk-artifacts"),
            publish_key: env_or("PUBLISH_KEY", "transformed/transformed_dataset.csv"),
            credit_fetch_timeout_secs: {
                let timeout: u64 = env_or("CREDIT_FETCH_TIMEOUT_SECS", "2")
                    .parse()
                    .map_err(|_| anyhow::anyhow!("CREDIT_FETCH_TIMEOUT_SECS must be a number"))?;
                if timeout == 0 {
                    anyhow::bail!("CREDIT_FETCH_TIMEOUT_SECS must be at least 1");
                }
                timeout
            },
            publish_timeout_secs: {
                let timeout: u64 = env_or("PUBLISH_TIMEOUT_SECS", "30")
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PUBLISH_TIMEOUT_SECS must be a number"))?;
                if timeout == 0 {
                    anyhow::bail!("PUBLISH_TIMEOUT_SECS must be at least 1");
                }
                timeout
            },
            credit_fetch_workers: {
                let workers: usize = env_or("CREDIT_FETCH_WORKERS", "8")
                    .parse()
                    .map_err(|_| anyhow::anyhow!("CREDIT_FETCH_WORKERS must be a number"))?;
                if workers == 0 {
                    anyhow::bail!("CREDIT_FETCH_WORKERS must be at least 1");
                }
                workers
            },
            credit_fetch_retries: env_or("CREDIT_FETCH_RETRIES", "2")
                .parse()
                .map_err(|_| anyhow::anyhow!("CREDIT_FETCH_RETRIES must be a number"))?,
            max_validation_issues: match std::env::var("MAX_VALIDATION_ISSUES") {
                Ok(v) if !v.trim().is_empty() => Some(
                    v.parse()
                        .map_err(|_| anyhow::anyhow!("MAX_VALIDATION_ISSUES must be a number"))?,
                ),
                _ => None,
            },
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Loans CSV: {}", config.loans_csv_path);
        tracing::debug!("Credit API: {}", config.credit_api_base_url);
        tracing::debug!(
            "Fetch pool: {} workers, {} retries, {}s timeout",
            config.credit_fetch_workers,
            config.credit_fetch_retries,
            config.credit_fetch_timeout_secs
        );
        tracing::debug!("Publish timeout: {}s", config.publish_timeout_secs);
        if let Some(limit) = config.max_validation_issues {
            tracing::info!("Validation gate enabled: halt above {} issues", limit);
        }

        Ok(config)
    }
}
