use std::time::Duration;

use loan_risk_pipeline::config::Config;
use loan_risk_pipeline::credit_client::CreditScoreClient;
use loan_risk_pipeline::db::Database;
use loan_risk_pipeline::ingestion::IngestionStage;
use loan_risk_pipeline::orchestration::OrchestrationController;
use loan_risk_pipeline::publisher::ObjectStorePublisher;
use loan_risk_pipeline::transformation::TransformationStage;
use loan_risk_pipeline::validation::ValidationStage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point: runs one full pipeline pass.
///
/// Initializes logging and configuration, connects to the customer store,
/// wires the three stages into the orchestration controller, and exits
/// non-zero if any stage fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_risk_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let credit_client = CreditScoreClient::new(
        config.credit_api_base_url.clone(),
        Duration::from_secs(config.credit_fetch_timeout_secs),
    )?;
    let publisher = ObjectStorePublisher::new(
        config.object_store_url.clone(),
        config.object_store_bucket.clone(),
        Duration::from_secs(config.publish_timeout_secs),
    )?;

    let controller = OrchestrationController::new(
        IngestionStage::new(
            config.loans_csv_path.clone(),
            db.pool.clone(),
            credit_client,
            config.unified_output_path.clone(),
            config.credit_fetch_workers,
            config.credit_fetch_retries,
        ),
        ValidationStage::new(),
        TransformationStage::new(
            config.transformed_output_path.clone(),
            publisher,
            config.publish_key.clone(),
        ),
        config.max_validation_issues,
    );

    match controller.run().await {
        Ok(summary) => {
            tracing::info!(
                "Pipeline summary: {} rows x {} columns ingested, {} validation issues, {} rows transformed, published: {}",
                summary.rows_ingested,
                summary.columns_ingested,
                summary.validation_issues,
                summary.rows_transformed,
                summary.published
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}
