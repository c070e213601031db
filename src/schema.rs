use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current schema description version. Bump when the unified column set
/// changes so downstream consumers can detect stale snapshots.
pub const SCHEMA_VERSION: u32 = 1;

/// One column of the unified dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    LoanId,
    CustomerId,
    LoanAmount,
    TermMonths,
    InterestRate,
    ApplicationDate,
    Status,
    Defaulted,
    Age,
    Gender,
    Income,
    EmploymentStatus,
    City,
    CreditScore,
    CreditScoreProvider,
    LastUpdated,
}

impl Column {
    /// Wire/header name of the column.
    pub fn name(&self) -> &'static str {
        match self {
            Column::LoanId => "loan_id",
            Column::CustomerId => "customer_id",
            Column::LoanAmount => "loan_amount",
            Column::TermMonths => "term_months",
            Column::InterestRate => "interest_rate",
            Column::ApplicationDate => "application_date",
            Column::Status => "status",
            Column::Defaulted => "defaulted",
            Column::Age => "age",
            Column::Gender => "gender",
            Column::Income => "income",
            Column::EmploymentStatus => "employment_status",
            Column::City => "city",
            Column::CreditScore => "credit_score",
            Column::CreditScoreProvider => "credit_score_provider",
            Column::LastUpdated => "last_updated",
        }
    }

    /// Parses a header name back into a column. Unknown headers are ignored
    /// by callers.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.name() == name)
    }

    /// Every unified column, in snapshot header order.
    pub fn all() -> Vec<Column> {
        vec![
            Column::LoanId,
            Column::CustomerId,
            Column::LoanAmount,
            Column::TermMonths,
            Column::InterestRate,
            Column::ApplicationDate,
            Column::Status,
            Column::Defaulted,
            Column::Age,
            Column::Gender,
            Column::Income,
            Column::EmploymentStatus,
            Column::City,
            Column::CreditScore,
            Column::CreditScoreProvider,
            Column::LastUpdated,
        ]
    }

    /// Columns contributed by the loan source.
    pub fn loan_columns() -> Vec<Column> {
        vec![
            Column::LoanId,
            Column::CustomerId,
            Column::LoanAmount,
            Column::TermMonths,
            Column::InterestRate,
            Column::ApplicationDate,
            Column::Status,
            Column::Defaulted,
        ]
    }

    /// Columns contributed by the customer source.
    pub fn customer_columns() -> Vec<Column> {
        vec![
            Column::Age,
            Column::Gender,
            Column::Income,
            Column::EmploymentStatus,
            Column::City,
        ]
    }

    /// Columns contributed by the credit-score service.
    pub fn credit_columns() -> Vec<Column> {
        vec![
            Column::CreditScore,
            Column::CreditScoreProvider,
            Column::LastUpdated,
        ]
    }
}

/// Explicit, versioned description of which columns a dataset carries.
///
/// Built once per run during ingestion; validation's schema check and
/// transformation's derived-field applicability are lookups against this,
/// not per-row probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub version: u32,
    columns: BTreeSet<Column>,
}

impl DatasetSchema {
    /// Schema carrying the given columns.
    pub fn new(columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns: columns.into_iter().collect(),
        }
    }

    /// The full expected unified schema.
    pub fn expected() -> Self {
        Self::new(Column::all())
    }

    /// Rebuilds a schema from a snapshot's CSV header row. Unknown headers
    /// are skipped.
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(headers.into_iter().filter_map(Column::from_name))
    }

    /// Whether the dataset carries the given column.
    pub fn has(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Number of columns present.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Expected columns absent from this schema, in header order.
    pub fn missing_from_expected(&self) -> Vec<String> {
        Column::all()
            .into_iter()
            .filter(|c| !self.columns.contains(c))
            .map(|c| c.name().to_string())
            .collect()
    }
}
