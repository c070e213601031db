use crate::schema::DatasetSchema;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

// ============ Source Models ============

/// Review status of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Approved,
    Rejected,
    Pending,
}

/// Serde helper for the `defaulted` flag, which the loan source encodes
/// as `0`/`1` rather than `true`/`false`.
pub mod bool_as_int {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}

/// One loan application from the flat-file source.
///
/// Loans are the anchor entity: every loan row survives into the unified
/// dataset regardless of join outcomes. `application_date` is kept as the
/// raw `YYYY-MM-DD` string; it is only parsed when deriving date features,
/// so a malformed date degrades those features instead of failing the load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Unique loan identifier.
    pub loan_id: String,
    /// Foreign key into the customer table.
    pub customer_id: String,
    /// Requested amount, non-negative currency.
    pub loan_amount: f64,
    /// Term in months, expected range 6-360.
    pub term_months: i64,
    /// Annual interest rate in percent.
    pub interest_rate: f64,
    /// Application date as `YYYY-MM-DD`.
    pub application_date: String,
    /// Review status.
    pub status: LoanStatus,
    /// Whether the loan later defaulted.
    #[serde(with = "bool_as_int")]
    pub defaulted: bool,
}

/// One customer from the relational demographics table.
///
/// All demographic fields are nullable in the store, so they stay optional
/// here; missing values flow into the validation report rather than failing
/// the read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Unique customer identifier (primary key).
    pub customer_id: String,
    /// Age in years.
    pub age: Option<i64>,
    /// Gender code.
    pub gender: Option<String>,
    /// Annual income, non-negative currency.
    pub income: Option<f64>,
    /// Employment status label.
    pub employment_status: Option<String>,
    /// City of residence.
    pub city: Option<String>,
}

/// One customer's credit standing as returned by the credit-score service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditScoreRecord {
    /// Foreign key into the customer table.
    pub customer_id: String,
    /// FICO-convention score, valid domain 300-850.
    pub credit_score: i64,
    /// Reporting bureau.
    pub credit_score_provider: String,
    /// When the provider last refreshed the score. The service emits
    /// zone-less ISO timestamps, hence `NaiveDateTime`.
    pub last_updated: NaiveDateTime,
}

// ============ Derived Models ============

/// The left-join composition of loan, customer, and credit-score records.
///
/// Invariant: every `LoanRecord` contributes exactly one `UnifiedRecord`;
/// failed joins leave the right-hand fields `None`, they never drop rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub loan_id: String,
    pub customer_id: String,
    pub loan_amount: f64,
    pub term_months: i64,
    pub interest_rate: f64,
    pub application_date: String,
    pub status: LoanStatus,
    #[serde(with = "bool_as_int")]
    pub defaulted: bool,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub income: Option<f64>,
    pub employment_status: Option<String>,
    pub city: Option<String>,
    pub credit_score: Option<i64>,
    pub credit_score_provider: Option<String>,
    pub last_updated: Option<NaiveDateTime>,
}

impl UnifiedRecord {
    /// Composes one unified row from a loan and its (possibly absent)
    /// customer and credit-score matches.
    pub fn from_parts(
        loan: LoanRecord,
        customer: Option<&CustomerRecord>,
        score: Option<&CreditScoreRecord>,
    ) -> Self {
        Self {
            loan_id: loan.loan_id,
            customer_id: loan.customer_id,
            loan_amount: loan.loan_amount,
            term_months: loan.term_months,
            interest_rate: loan.interest_rate,
            application_date: loan.application_date,
            status: loan.status,
            defaulted: loan.defaulted,
            age: customer.and_then(|c| c.age),
            gender: customer.and_then(|c| c.gender.clone()),
            income: customer.and_then(|c| c.income),
            employment_status: customer.and_then(|c| c.employment_status.clone()),
            city: customer.and_then(|c| c.city.clone()),
            credit_score: score.map(|s| s.credit_score),
            credit_score_provider: score.map(|s| s.credit_score_provider.clone()),
            last_updated: score.map(|s| s.last_updated),
        }
    }
}

/// A unified record extended with imputed values and derived features.
///
/// `credit_score` and `income` widen to `f64` because imputation fills
/// nulls with batch statistics (mean/median) that are rarely integral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub loan_id: String,
    pub customer_id: String,
    pub loan_amount: f64,
    pub term_months: i64,
    pub interest_rate: f64,
    pub application_date: String,
    pub status: LoanStatus,
    #[serde(with = "bool_as_int")]
    pub defaulted: bool,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub income: Option<f64>,
    pub employment_status: Option<String>,
    pub city: Option<String>,
    pub credit_score: Option<f64>,
    pub credit_score_provider: Option<String>,
    pub last_updated: Option<NaiveDateTime>,
    /// `loan_amount / income`; `None` when income is absent or zero.
    pub loan_to_income_ratio: Option<f64>,
    /// Categorical risk bucket derived from the credit score.
    pub risk_segment: Option<String>,
    /// Year component of `application_date`, when parseable.
    pub application_year: Option<i32>,
    /// Month component of `application_date`, when parseable.
    pub application_month: Option<u32>,
}

/// The ingestion stage's output: the unified records plus the explicit
/// schema describing which columns the run's sources actually contributed.
#[derive(Debug, Clone)]
pub struct UnifiedDataset {
    pub schema: DatasetSchema,
    pub records: Vec<UnifiedRecord>,
}

impl UnifiedDataset {
    /// Row count of the unified dataset.
    pub fn row_count(&self) -> usize {
        self.records.len()
    }
}

// ============ Validation Report ============

/// Structured data-quality report produced by the validation stage.
///
/// Constructed fresh per run, immutable once returned. The orchestration
/// controller consults `issue_count()` for its proceed/caution decision;
/// the report never blocks validation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Expected column names absent from the unified schema.
    pub missing_columns: Vec<String>,
    /// Null-entry counts per column; columns with zero nulls are excluded.
    pub missing_value_counts: BTreeMap<String, usize>,
    /// Ordered human-readable range/validity violations.
    pub issues: Vec<String>,
}

impl ValidationReport {
    /// Canonical issue count: the length of `issues`.
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// True when any check produced a finding.
    pub fn is_clean(&self) -> bool {
        self.missing_columns.is_empty()
            && self.missing_value_counts.is_empty()
            && self.issues.is_empty()
    }
}
