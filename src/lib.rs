//! Loan-Risk Pipeline Library
//!
//! This library assembles a unified loan-risk dataset from three
//! heterogeneous sources (a flat file of loan applications, a relational
//! store of customer demographics, and a per-customer credit-score HTTP
//! service that fails intermittently), then validates and enriches the
//! merged data before publishing it.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `credit_client`: Credit-score service client.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `ingestion`: Source loading, credit-score fetching, and joining.
//! - `models`: Core data models.
//! - `orchestration`: Stage sequencing and the quality gate.
//! - `publisher`: Object-store upload client.
//! - `schema`: Explicit dataset schema description.
//! - `transformation`: Imputation and feature derivation.
//! - `validation`: Data-quality report computation.

pub mod config;
pub mod credit_client;
pub mod db;
pub mod errors;
pub mod ingestion;
pub mod models;
pub mod orchestration;
pub mod publisher;
pub mod schema;
pub mod transformation;
pub mod validation;
