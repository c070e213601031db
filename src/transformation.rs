use crate::errors::PipelineError;
use crate::models::{TransformedRecord, UnifiedDataset, UnifiedRecord};
use crate::publisher::ObjectStorePublisher;
use crate::schema::Column;
use chrono::{Datelike, NaiveDate};
use std::path::Path;

/// Result of one transformation run.
#[derive(Debug)]
pub struct TransformOutcome {
    /// The transformed records, also written to local storage.
    pub records: Vec<TransformedRecord>,
    /// Whether the external publish succeeded. A `false` here is a
    /// warning-level outcome, not a stage failure.
    pub published: bool,
}

/// Imputes missing numeric fields from batch statistics, derives feature
/// columns and the risk segment, writes the result locally, and publishes
/// it to the external object store.
pub struct TransformationStage {
    output_path: String,
    publisher: ObjectStorePublisher,
    publish_key: String,
}

impl TransformationStage {
    pub fn new(output_path: String, publisher: ObjectStorePublisher, publish_key: String) -> Self {
        Self {
            output_path,
            publisher,
            publish_key,
        }
    }

    /// Runs the full transformation. Derived-field applicability is decided
    /// once against the dataset schema, not per row.
    pub async fn transform(
        &self,
        dataset: &UnifiedDataset,
    ) -> Result<TransformOutcome, PipelineError> {
        let schema = &dataset.schema;

        // Imputation statistics are batch-local and recomputed every run.
        let mean_score = if schema.has(Column::CreditScore) {
            let scores: Vec<f64> = dataset
                .records
                .iter()
                .filter_map(|r| r.credit_score)
                .map(|s| s as f64)
                .collect();
            let mean = mean(&scores);
            if let Some(m) = mean {
                tracing::info!("Imputing missing credit_score with mean={:.2}", m);
            }
            mean
        } else {
            None
        };

        let median_income = if schema.has(Column::Income) {
            let incomes: Vec<f64> = dataset.records.iter().filter_map(|r| r.income).collect();
            let median = median(&incomes);
            if let Some(m) = median {
                tracing::info!("Imputing missing income with median={:.2}", m);
            }
            median
        } else {
            None
        };

        let derive_ratio = schema.has(Column::LoanAmount) && schema.has(Column::Income);
        let derive_segment = schema.has(Column::CreditScore);

        let records: Vec<TransformedRecord> = dataset
            .records
            .iter()
            .map(|r| {
                transform_record(r, mean_score, median_income, derive_ratio, derive_segment)
            })
            .collect();

        self.write_output(&records)?;
        tracing::info!("Transformed dataset saved locally to {}", self.output_path);

        let published = match self
            .publisher
            .upload(&self.output_path, &self.publish_key)
            .await
        {
            Ok(()) => {
                tracing::info!("Published transformed dataset to object store");
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Publish failed, local artifact remains valid for retry: {}",
                    e
                );
                false
            }
        };

        Ok(TransformOutcome { records, published })
    }

    /// Writes the transformed records as a single consolidated file. The
    /// header row is written even when the batch is empty.
    fn write_output(&self, records: &[TransformedRecord]) -> Result<(), PipelineError> {
        if let Some(parent) = Path::new(&self.output_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.output_path)
            .map_err(|e| {
                PipelineError::Storage(format!(
                    "Cannot write output {}: {}",
                    self.output_path, e
                ))
            })?;
        writer.write_record(output_headers()).map_err(|e| {
            PipelineError::Storage(format!("Failed to write output header: {}", e))
        })?;
        for record in records {
            writer.serialize(record).map_err(|e| {
                PipelineError::Storage(format!("Failed to serialize output row: {}", e))
            })?;
        }
        writer
            .flush()
            .map_err(|e| PipelineError::Storage(format!("Failed to flush output: {}", e)))?;
        Ok(())
    }
}

/// Header row of the transformed output: the unified column union followed
/// by the derived columns, in serialization order.
fn output_headers() -> Vec<&'static str> {
    let mut headers: Vec<&'static str> = Column::all().iter().map(|c| c.name()).collect();
    headers.extend([
        "loan_to_income_ratio",
        "risk_segment",
        "application_year",
        "application_month",
    ]);
    headers
}

/// Transforms one unified record using precomputed batch statistics.
fn transform_record(
    r: &UnifiedRecord,
    mean_score: Option<f64>,
    median_income: Option<f64>,
    derive_ratio: bool,
    derive_segment: bool,
) -> TransformedRecord {
    let credit_score = r.credit_score.map(|s| s as f64).or(mean_score);
    let income = r.income.or(median_income);

    let loan_to_income_ratio = if derive_ratio {
        loan_to_income_ratio(r.loan_amount, income)
    } else {
        None
    };

    let risk_segment = if derive_segment {
        credit_score.map(|s| self::risk_segment(s).to_string())
    } else {
        None
    };

    let (application_year, application_month) = date_features(&r.application_date);

    TransformedRecord {
        loan_id: r.loan_id.clone(),
        customer_id: r.customer_id.clone(),
        loan_amount: r.loan_amount,
        term_months: r.term_months,
        interest_rate: r.interest_rate,
        application_date: r.application_date.clone(),
        status: r.status,
        defaulted: r.defaulted,
        age: r.age,
        gender: r.gender.clone(),
        income,
        employment_status: r.employment_status.clone(),
        city: r.city.clone(),
        credit_score,
        credit_score_provider: r.credit_score_provider.clone(),
        last_updated: r.last_updated,
        loan_to_income_ratio,
        risk_segment,
        application_year,
        application_month,
    }
}

/// Arithmetic mean of the batch's observed values. `None` on an empty batch.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the batch's observed values. Even-length batches take the
/// midpoint of the two middle values. `None` on an empty batch.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// `loan_amount / income`; a zero or absent income yields `None` rather
/// than an error or an infinity.
pub fn loan_to_income_ratio(loan_amount: f64, income: Option<f64>) -> Option<f64> {
    match income {
        Some(i) if i != 0.0 => Some(loan_amount / i),
        _ => None,
    }
}

/// Risk bucket thresholds, closed-open: boundary scores map to the
/// lower-severity bucket.
pub fn risk_segment(score: f64) -> &'static str {
    if score < 580.0 {
        "High Risk"
    } else if score < 670.0 {
        "Medium Risk"
    } else {
        "Low Risk"
    }
}

/// Year and month of an application date, `None` when unparseable.
pub fn date_features(raw: &str) -> (Option<i32>, Option<u32>) {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => (Some(date.year()), Some(date.month())),
        Err(_) => (None, None),
    }
}
