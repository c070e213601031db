use crate::errors::{PipelineError, ResultExt};
use crate::ingestion::IngestionStage;
use crate::models::ValidationReport;
use crate::transformation::TransformationStage;
use crate::validation::ValidationStage;
use serde::Serialize;

/// Final outcome of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub rows_ingested: usize,
    pub columns_ingested: usize,
    pub validation_issues: usize,
    pub rows_transformed: usize,
    pub published: bool,
}

/// Runs the three stages in sequence: ingestion, validation,
/// transformation. Validation feeds the quality gate but never alters
/// transformation's input. Any unhandled stage error fails the whole run;
/// artifacts already written stay on disk (no rollback).
pub struct OrchestrationController {
    ingestion: IngestionStage,
    validation: ValidationStage,
    transformation: TransformationStage,
    max_validation_issues: Option<usize>,
}

impl OrchestrationController {
    pub fn new(
        ingestion: IngestionStage,
        validation: ValidationStage,
        transformation: TransformationStage,
        max_validation_issues: Option<usize>,
    ) -> Self {
        Self {
            ingestion,
            validation,
            transformation,
            max_validation_issues,
        }
    }

    /// Executes one pipeline pass and reports the summary.
    pub async fn run(&self) -> Result<PipelineSummary, PipelineError> {
        tracing::info!("Starting ingestion stage");
        let dataset = self
            .ingestion
            .ingest()
            .await
            .context("Ingestion stage failed")?;
        tracing::info!(
            "Ingestion complete: {} rows, {} columns",
            dataset.row_count(),
            dataset.schema.column_count()
        );

        tracing::info!("Starting validation stage");
        let report = self.validation.validate(&dataset);
        tracing::info!("Validation complete: {} issues", report.issue_count());

        self.apply_quality_gate(&report)?;

        tracing::info!("Starting transformation stage");
        let outcome = self
            .transformation
            .transform(&dataset)
            .await
            .context("Transformation stage failed")?;
        tracing::info!("Transformation complete");

        let summary = PipelineSummary {
            rows_ingested: dataset.row_count(),
            columns_ingested: dataset.schema.column_count(),
            validation_issues: report.issue_count(),
            rows_transformed: outcome.records.len(),
            published: outcome.published,
        };
        tracing::info!("Pipeline completed successfully");
        Ok(summary)
    }

    /// The quality gate. Issues are logged and the run proceeds; only when
    /// a threshold is configured and exceeded does the run halt before
    /// transformation.
    fn apply_quality_gate(&self, report: &ValidationReport) -> Result<(), PipelineError> {
        let issues = report.issue_count();
        if issues == 0 {
            tracing::info!("Data passed validation, proceeding to transformation");
            return Ok(());
        }

        if let Some(limit) = self.max_validation_issues {
            if issues > limit {
                return Err(PipelineError::QualityGate(format!(
                    "{} validation issues exceed the configured limit of {}",
                    issues, limit
                )));
            }
        }

        tracing::warn!(
            "{} data quality issues detected, proceeding with caution",
            issues
        );
        Ok(())
    }
}
