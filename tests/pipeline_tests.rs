//! Unit tests for the pipeline's pure logic: risk segmentation, feature
//! derivation, imputation statistics, and validation report computation.

use loan_risk_pipeline::models::{
    LoanStatus, UnifiedDataset, UnifiedRecord, ValidationReport,
};
use loan_risk_pipeline::schema::{Column, DatasetSchema};
use loan_risk_pipeline::transformation::{
    date_features, loan_to_income_ratio, mean, median, risk_segment,
};
use loan_risk_pipeline::validation::ValidationStage;

/// Builds a clean unified record; tests mutate the fields they care about.
fn unified(loan_id: &str) -> UnifiedRecord {
    UnifiedRecord {
        loan_id: loan_id.to_string(),
        customer_id: "CUST0001".to_string(),
        loan_amount: 50_000.0,
        term_months: 36,
        interest_rate: 7.9,
        application_date: "2025-06-15".to_string(),
        status: LoanStatus::Approved,
        defaulted: false,
        age: Some(35),
        gender: Some("F".to_string()),
        income: Some(80_000.0),
        employment_status: Some("Employed".to_string()),
        city: Some("Seattle".to_string()),
        credit_score: Some(700),
        credit_score_provider: Some("Equifax".to_string()),
        last_updated: None,
    }
}

fn full_dataset(records: Vec<UnifiedRecord>) -> UnifiedDataset {
    UnifiedDataset {
        schema: DatasetSchema::expected(),
        records,
    }
}

#[cfg(test)]
mod risk_segment_tests {
    use super::*;

    #[test]
    fn threshold_boundaries_map_to_lower_severity() {
        assert_eq!(risk_segment(579.0), "High Risk");
        assert_eq!(risk_segment(580.0), "Medium Risk");
        assert_eq!(risk_segment(669.0), "Medium Risk");
        assert_eq!(risk_segment(670.0), "Low Risk");
    }

    #[test]
    fn domain_extremes() {
        assert_eq!(risk_segment(300.0), "High Risk");
        assert_eq!(risk_segment(850.0), "Low Risk");
    }

    #[test]
    fn fractional_imputed_scores_bucket_correctly() {
        assert_eq!(risk_segment(579.9), "High Risk");
        assert_eq!(risk_segment(669.5), "Medium Risk");
    }
}

#[cfg(test)]
mod ratio_tests {
    use super::*;

    #[test]
    fn basic_derivation() {
        assert_eq!(loan_to_income_ratio(100_000.0, Some(50_000.0)), Some(2.0));
    }

    #[test]
    fn zero_income_yields_none() {
        assert_eq!(loan_to_income_ratio(100_000.0, Some(0.0)), None);
    }

    #[test]
    fn absent_income_yields_none() {
        assert_eq!(loan_to_income_ratio(100_000.0, None), None);
    }
}

#[cfg(test)]
mod imputation_tests {
    use super::*;

    #[test]
    fn mean_of_batch() {
        assert_eq!(mean(&[600.0, 700.0, 800.0]), Some(700.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[30_000.0, 50_000.0, 90_000.0]), Some(50_000.0));
        assert_eq!(median(&[20_000.0, 40_000.0, 60_000.0, 80_000.0]), Some(50_000.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn median_is_order_independent() {
        assert_eq!(median(&[90_000.0, 30_000.0, 50_000.0]), Some(50_000.0));
    }
}

#[cfg(test)]
mod date_feature_tests {
    use super::*;

    #[test]
    fn valid_date_parses() {
        assert_eq!(date_features("2024-11-03"), (Some(2024), Some(11)));
    }

    #[test]
    fn unparseable_dates_yield_nulls() {
        assert_eq!(date_features("not-a-date"), (None, None));
        assert_eq!(date_features("2024-13-40"), (None, None));
        assert_eq!(date_features(""), (None, None));
    }
}

#[cfg(test)]
mod range_check_tests {
    use super::*;

    #[test]
    fn fico_boundaries_pass() {
        let mut low = unified("LOAN1");
        low.credit_score = Some(300);
        let mut high = unified("LOAN2");
        high.credit_score = Some(850);

        let report = ValidationStage::new().validate(&full_dataset(vec![low, high]));
        assert!(report.issues.is_empty());
    }

    #[test]
    fn fico_outliers_reported() {
        let mut below = unified("LOAN1");
        below.credit_score = Some(299);
        let report = ValidationStage::new().validate(&full_dataset(vec![below]));
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].contains("FICO"));

        let mut above = unified("LOAN2");
        above.credit_score = Some(851);
        let report = ValidationStage::new().validate(&full_dataset(vec![above]));
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn null_scores_excluded_from_fico_check() {
        let mut record = unified("LOAN1");
        record.credit_score = None;
        record.credit_score_provider = None;

        let report = ValidationStage::new().validate(&full_dataset(vec![record]));
        assert!(report.issues.is_empty());
    }

    #[test]
    fn negative_loan_amount_reported() {
        let mut record = unified("LOAN1");
        record.loan_amount = -1.0;

        let report = ValidationStage::new().validate(&full_dataset(vec![record]));
        assert!(report
            .issues
            .contains(&"Loan amounts contain negative values".to_string()));
    }

    #[test]
    fn term_window_enforced() {
        let mut short = unified("LOAN1");
        short.term_months = 5;
        let report = ValidationStage::new().validate(&full_dataset(vec![short]));
        assert!(report
            .issues
            .contains(&"Loan terms out of realistic range".to_string()));

        let mut long = unified("LOAN2");
        long.term_months = 361;
        let report = ValidationStage::new().validate(&full_dataset(vec![long]));
        assert_eq!(report.issues.len(), 1);

        let mut edge = unified("LOAN3");
        edge.term_months = 6;
        let mut other_edge = unified("LOAN4");
        other_edge.term_months = 360;
        let report = ValidationStage::new().validate(&full_dataset(vec![edge, other_edge]));
        assert!(report.issues.is_empty());
    }

    #[test]
    fn missing_term_column_gets_distinct_issue() {
        let mut columns = Column::loan_columns();
        columns.retain(|c| *c != Column::TermMonths);
        columns.extend(Column::customer_columns());
        columns.extend(Column::credit_columns());

        let dataset = UnifiedDataset {
            schema: DatasetSchema::new(columns),
            records: vec![unified("LOAN1")],
        };

        let report = ValidationStage::new().validate(&dataset);
        assert!(report
            .issues
            .contains(&"Column 'term_months' missing, cannot validate loan duration".to_string()));
        assert_eq!(report.missing_columns, vec!["term_months".to_string()]);
    }

    #[test]
    fn negative_income_reported() {
        let mut record = unified("LOAN1");
        record.income = Some(-100.0);

        let report = ValidationStage::new().validate(&full_dataset(vec![record]));
        assert!(report
            .issues
            .contains(&"Income values contain negatives".to_string()));
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    #[test]
    fn missing_value_counts_exclude_zero_null_columns() {
        let mut degraded = unified("LOAN1");
        degraded.credit_score = None;
        degraded.credit_score_provider = None;
        degraded.last_updated = None;
        let clean = unified("LOAN2");

        let report = ValidationStage::new().validate(&full_dataset(vec![degraded, clean]));

        assert_eq!(report.missing_value_counts.get("credit_score"), Some(&1));
        assert_eq!(
            report.missing_value_counts.get("credit_score_provider"),
            Some(&1)
        );
        // last_updated is null on both builder records
        assert_eq!(report.missing_value_counts.get("last_updated"), Some(&2));
        assert!(!report.missing_value_counts.contains_key("age"));
        assert!(!report.missing_value_counts.contains_key("loan_amount"));
    }

    #[test]
    fn missing_credit_columns_reported_not_counted() {
        let mut columns = Column::loan_columns();
        columns.extend(Column::customer_columns());
        let mut record = unified("LOAN1");
        record.credit_score = None;
        record.credit_score_provider = None;
        record.last_updated = None;

        let dataset = UnifiedDataset {
            schema: DatasetSchema::new(columns),
            records: vec![record],
        };
        let report = ValidationStage::new().validate(&dataset);

        assert_eq!(
            report.missing_columns,
            vec!["credit_score", "credit_score_provider", "last_updated"]
        );
        assert!(!report.missing_value_counts.contains_key("credit_score"));
    }

    #[test]
    fn validation_is_deterministic() {
        let mut degraded = unified("LOAN1");
        degraded.credit_score = Some(299);
        degraded.income = None;
        let dataset = full_dataset(vec![degraded, unified("LOAN2")]);

        let stage = ValidationStage::new();
        let first = stage.validate(&dataset);
        let second = stage.validate(&dataset);
        assert_eq!(first, second);
    }

    #[test]
    fn issue_count_is_issues_len() {
        let report = ValidationReport {
            missing_columns: vec!["term_months".to_string()],
            missing_value_counts: Default::default(),
            issues: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(report.issue_count(), 2);
        assert!(!report.is_clean());
    }
}

#[cfg(test)]
mod error_handling_tests {
    use loan_risk_pipeline::errors::{PipelineError, ResultExt};

    #[test]
    fn error_display() {
        let error = PipelineError::SourceLoad("data/loans.csv unreadable".to_string());
        let display = format!("{}", error);
        assert!(display.contains("Source load failed"));
        assert!(display.contains("data/loans.csv"));

        let error = PipelineError::RemoteFetch("timeout".to_string());
        assert!(format!("{}", error).contains("Remote fetch failed"));

        let error = PipelineError::QualityGate("3 issues exceed limit of 0".to_string());
        assert!(format!("{}", error).contains("Quality gate"));
    }

    #[test]
    fn context_chains_messages() {
        let result: Result<(), PipelineError> =
            Err(PipelineError::Storage("disk full".to_string()));
        let chained = result.context("Ingestion stage failed");

        let display = format!("{}", chained.unwrap_err());
        assert!(display.contains("Ingestion stage failed"));
        assert!(display.contains("disk full"));
    }
}

#[cfg(test)]
mod model_encoding_tests {
    use loan_risk_pipeline::models::{CreditScoreRecord, LoanRecord};

    #[test]
    fn credit_score_record_parses_service_payload() {
        // The service emits zone-less ISO timestamps.
        let payload = serde_json::json!({
            "customer_id": "CUST0001",
            "credit_score": 712,
            "credit_score_provider": "Experian",
            "last_updated": "2026-08-20T14:02:11.381220"
        });

        let record: CreditScoreRecord = serde_json::from_value(payload).unwrap();
        assert_eq!(record.credit_score, 712);
        assert_eq!(record.credit_score_provider, "Experian");
    }

    #[test]
    fn loan_rows_roundtrip_zero_one_defaulted_flag() {
        let csv_data = "loan_id,customer_id,loan_amount,term_months,interest_rate,application_date,status,defaulted\n\
                        LOAN000001,CUST0001,250000.5,60,12.25,2025-01-31,APPROVED,1\n\
                        LOAN000002,CUST0002,9000,12,4.1,2025-02-01,PENDING,0\n";

        let mut reader = csv::Reader::from_reader(csv_data.as_bytes());
        let loans: Vec<LoanRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(loans.len(), 2);
        assert!(loans[0].defaulted);
        assert!(!loans[1].defaulted);

        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(&loans[0]).unwrap();
        let written = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert!(written.contains("APPROVED"));
        assert!(written.ends_with(",1\n"));
    }
}
