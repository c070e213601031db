use crate::credit_client::{create_credit_circuit, CreditScoreClient};
use crate::errors::{PipelineError, ResultExt};
use crate::models::{CreditScoreRecord, CustomerRecord, LoanRecord, UnifiedDataset, UnifiedRecord};
use crate::schema::{Column, DatasetSchema};
use failsafe::futures::CircuitBreaker;
use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Loads the three sources, left-joins them anchored on loans, and persists
/// the unified snapshot.
///
/// Failure policy: the loan and customer sources are fatal (loans are the
/// anchor entity, no partial data is acceptable); credit-score fetches
/// degrade per customer after retries are exhausted.
pub struct IngestionStage {
    loans_path: String,
    pool: SqlitePool,
    client: CreditScoreClient,
    snapshot_path: String,
    workers: usize,
    retries: u32,
}

impl IngestionStage {
    pub fn new(
        loans_path: String,
        pool: SqlitePool,
        client: CreditScoreClient,
        snapshot_path: String,
        workers: usize,
        retries: u32,
    ) -> Self {
        Self {
            loans_path,
            pool,
            client,
            snapshot_path,
            workers: workers.max(1),
            retries,
        }
    }

    /// Runs the full ingestion: load, fetch, join, snapshot.
    pub async fn ingest(&self) -> Result<UnifiedDataset, PipelineError> {
        let loans = self.load_loans()?;
        tracing::info!("Loans data loaded: {} rows", loans.len());

        let customers = self.load_customers().await?;
        tracing::info!("Customers data loaded: {} rows", customers.len());

        let scores = self.fetch_credit_scores(&customers).await;
        tracing::info!(
            "Credit scores loaded: {} of {} customers",
            scores.len(),
            customers.len()
        );

        let customer_map: HashMap<String, CustomerRecord> = customers
            .into_iter()
            .map(|c| (c.customer_id.clone(), c))
            .collect();

        let records = join_sources(loans, &customer_map, &scores);

        // Credit columns enter the schema only when the service contributed
        // at least one record this run.
        let mut columns = Column::loan_columns();
        columns.extend(Column::customer_columns());
        if !scores.is_empty() {
            columns.extend(Column::credit_columns());
        }
        let dataset = UnifiedDataset {
            schema: DatasetSchema::new(columns),
            records,
        };

        tracing::info!(
            "Final merged dataset: {} rows, {} columns",
            dataset.row_count(),
            dataset.schema.column_count()
        );

        self.write_snapshot(&dataset.records)?;
        tracing::info!("Unified dataset saved to {}", self.snapshot_path);

        Ok(dataset)
    }

    /// Loads the loan source in full. Any read or parse failure is fatal.
    fn load_loans(&self) -> Result<Vec<LoanRecord>, PipelineError> {
        let mut reader = csv::Reader::from_path(&self.loans_path).map_err(|e| {
            PipelineError::SourceLoad(format!(
                "Cannot open loan source {}: {}",
                self.loans_path, e
            ))
        })?;

        let mut loans = Vec::new();
        for row in reader.deserialize() {
            let loan: LoanRecord = row.map_err(|e| {
                PipelineError::SourceLoad(format!(
                    "Malformed row in loan source {}: {}",
                    self.loans_path, e
                ))
            })?;
            loans.push(loan);
        }
        Ok(loans)
    }

    /// Loads the customer table in full via a relational query.
    async fn load_customers(&self) -> Result<Vec<CustomerRecord>, PipelineError> {
        sqlx::query_as::<_, CustomerRecord>(
            "SELECT customer_id, age, gender, income, employment_status, city FROM customers",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load customers table")
    }

    /// Fetches credit scores for every distinct customer through a fixed
    /// worker pool. Individual failures are retried with backoff behind a
    /// circuit breaker; customers still failing afterwards are simply
    /// absent from the result.
    async fn fetch_credit_scores(
        &self,
        customers: &[CustomerRecord],
    ) -> HashMap<String, CreditScoreRecord> {
        let breaker = create_credit_circuit();

        let results: Vec<Option<CreditScoreRecord>> = stream::iter(customers)
            .map(|customer| {
                let client = &self.client;
                let breaker = &breaker;
                let retries = self.retries;
                async move { fetch_with_retry(client, breaker, &customer.customer_id, retries).await }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        results
            .into_iter()
            .flatten()
            .map(|record| (record.customer_id.clone(), record))
            .collect()
    }

    /// Persists the unified result as a durable snapshot. The file always
    /// carries the full header union, even for a zero-row run, with empty
    /// fields for failed joins.
    fn write_snapshot(&self, records: &[UnifiedRecord]) -> Result<(), PipelineError> {
        if let Some(parent) = Path::new(&self.snapshot_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.snapshot_path)
            .map_err(|e| {
                PipelineError::Storage(format!(
                    "Cannot write snapshot {}: {}",
                    self.snapshot_path, e
                ))
            })?;
        writer
            .write_record(Column::all().iter().map(|c| c.name()))
            .map_err(|e| {
                PipelineError::Storage(format!("Failed to write snapshot header: {}", e))
            })?;
        for record in records {
            writer.serialize(record).map_err(|e| {
                PipelineError::Storage(format!("Failed to serialize snapshot row: {}", e))
            })?;
        }
        writer
            .flush()
            .map_err(|e| PipelineError::Storage(format!("Failed to flush snapshot: {}", e)))?;
        Ok(())
    }
}

/// Left-joins loans to customers and credit scores on `customer_id`.
///
/// Every loan row yields exactly one unified row; missing matches leave the
/// right-hand fields `None`. This is the pipeline's central invariant.
pub fn join_sources(
    loans: Vec<LoanRecord>,
    customers: &HashMap<String, CustomerRecord>,
    scores: &HashMap<String, CreditScoreRecord>,
) -> Vec<UnifiedRecord> {
    loans
        .into_iter()
        .map(|loan| {
            let customer = customers.get(&loan.customer_id);
            let score = scores.get(&loan.customer_id);
            UnifiedRecord::from_parts(loan, customer, score)
        })
        .collect()
}

/// Fetches one customer's score with bounded retries and doubling backoff.
/// Returns `None` once retries are exhausted or the circuit is open.
async fn fetch_with_retry<C: CircuitBreaker>(
    client: &CreditScoreClient,
    breaker: &C,
    customer_id: &str,
    retries: u32,
) -> Option<CreditScoreRecord> {
    let mut delay = Duration::from_millis(200);

    for attempt in 0..=retries {
        match breaker.call(client.fetch_score(customer_id)).await {
            Ok(record) => return Some(record),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!(
                    "Credit fetch for {} rejected: circuit open, failing fast",
                    customer_id
                );
                return None;
            }
            Err(failsafe::Error::Inner(e)) => {
                tracing::warn!(
                    "Credit fetch for {} failed on attempt {}: {}",
                    customer_id,
                    attempt + 1,
                    e
                );
                if attempt < retries {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    tracing::warn!(
        "No credit score for {} after {} attempts; fields degrade to null",
        customer_id,
        retries + 1
    );
    None
}
