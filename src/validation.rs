use crate::errors::PipelineError;
use crate::models::{UnifiedDataset, UnifiedRecord, ValidationReport};
use crate::schema::{Column, DatasetSchema};
use std::collections::BTreeMap;

/// Checks the unified dataset's schema, missing-value distribution, and
/// value ranges. Produces a structured report and never mutates data.
///
/// Data-quality findings are absorbed into the report, never raised; the
/// only fatal path is a snapshot that cannot be read at all.
#[derive(Debug, Default)]
pub struct ValidationStage;

impl ValidationStage {
    pub fn new() -> Self {
        Self
    }

    /// Pure, deterministic validation of an in-memory dataset.
    pub fn validate(&self, dataset: &UnifiedDataset) -> ValidationReport {
        let missing_columns = dataset.schema.missing_from_expected();
        if missing_columns.is_empty() {
            tracing::info!("All expected columns are present");
        } else {
            tracing::warn!("Missing expected columns: {:?}", missing_columns);
        }

        let missing_value_counts = count_missing_values(&dataset.schema, &dataset.records);
        if missing_value_counts.is_empty() {
            tracing::info!("No missing values found");
        } else {
            tracing::warn!("Missing values detected: {:?}", missing_value_counts);
        }

        let issues = range_checks(&dataset.schema, &dataset.records);
        if issues.is_empty() {
            tracing::info!("All numeric values are within valid ranges");
        } else {
            for issue in &issues {
                tracing::warn!("Data quality issue: {}", issue);
            }
        }

        ValidationReport {
            missing_columns,
            missing_value_counts,
            issues,
        }
    }

    /// Validates the on-disk snapshot when the in-memory result is not
    /// available. The schema is rebuilt from the snapshot's header row.
    pub fn validate_file(&self, path: &str) -> Result<ValidationReport, PipelineError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            PipelineError::SourceLoad(format!("Cannot open snapshot {}: {}", path, e))
        })?;

        let headers = reader
            .headers()
            .map_err(|e| {
                PipelineError::SourceLoad(format!("Cannot read snapshot headers: {}", e))
            })?
            .clone();
        let schema = DatasetSchema::from_headers(headers.iter());

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: UnifiedRecord = row.map_err(|e| {
                PipelineError::SourceLoad(format!("Malformed row in snapshot {}: {}", path, e))
            })?;
            records.push(record);
        }

        tracing::info!(
            "Loaded snapshot for validation: {} rows, {} columns",
            records.len(),
            schema.column_count()
        );

        Ok(self.validate(&UnifiedDataset { schema, records }))
    }
}

/// Counts null entries per column carried by the schema. Columns with zero
/// nulls are excluded; columns absent from the schema are reported as
/// missing columns instead, not as all-null.
fn count_missing_values(
    schema: &DatasetSchema,
    records: &[UnifiedRecord],
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();

    for column in Column::all() {
        if !schema.has(column) {
            continue;
        }
        let nulls = records.iter().filter(|r| is_null(r, column)).count();
        if nulls > 0 {
            counts.insert(column.name().to_string(), nulls);
        }
    }

    counts
}

/// Whether the given column is null on this record. Loan-source columns are
/// never null by construction.
fn is_null(record: &UnifiedRecord, column: Column) -> bool {
    match column {
        Column::Age => record.age.is_none(),
        Column::Gender => record.gender.is_none(),
        Column::Income => record.income.is_none(),
        Column::EmploymentStatus => record.employment_status.is_none(),
        Column::City => record.city.is_none(),
        Column::CreditScore => record.credit_score.is_none(),
        Column::CreditScoreProvider => record.credit_score_provider.is_none(),
        Column::LastUpdated => record.last_updated.is_none(),
        _ => false,
    }
}

/// Range and validity checks, each independently evaluated. Nulls are
/// excluded from the score and income checks, matching the source data's
/// degraded-but-legitimate absence semantics.
fn range_checks(schema: &DatasetSchema, records: &[UnifiedRecord]) -> Vec<String> {
    let mut issues = Vec::new();

    if schema.has(Column::LoanAmount) && records.iter().any(|r| r.loan_amount < 0.0) {
        issues.push("Loan amounts contain negative values".to_string());
    }

    if schema.has(Column::TermMonths) {
        if !records
            .iter()
            .all(|r| (6..=360).contains(&r.term_months))
        {
            issues.push("Loan terms out of realistic range".to_string());
        }
    } else {
        // This check cannot be skipped silently.
        issues.push("Column 'term_months' missing, cannot validate loan duration".to_string());
    }

    if schema.has(Column::CreditScore)
        && !records
            .iter()
            .filter_map(|r| r.credit_score)
            .all(|score| (300..=850).contains(&score))
    {
        issues.push("Credit scores out of FICO range (300-850)".to_string());
    }

    if schema.has(Column::Income)
        && records
            .iter()
            .filter_map(|r| r.income)
            .any(|income| income < 0.0)
    {
        issues.push("Income values contain negatives".to_string());
    }

    issues
}
