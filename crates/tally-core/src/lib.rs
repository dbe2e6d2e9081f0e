//! Tally Core Library
//!
//! Shared functionality for the Tally accounts-receivable aging tool:
//! - Database access and migrations
//! - Invoice workbook decoding
//! - Overdue aging and bucket classification
//! - Customer resolution for uploaded invoices
//! - AR aging report aggregation by region
//! - Region code table

pub mod aging;
pub mod db;
pub mod error;
pub mod import;
pub mod ingest;
pub mod models;
pub mod regions;
pub mod report;
pub mod resolver;
pub mod store;

/// Test utilities including an in-memory workbook builder
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aging::{age_invoice, days_overdue, Aging};
pub use db::Database;
pub use error::{Error, Result};
pub use import::{decode_workbook, parse_workbook, RejectReason, RowOutcome};
pub use ingest::{
    ingest_workbook, validate_upload, ImportRequest, IngestError, IngestResult, UploadLimits,
};
pub use models::*;
pub use regions::RegionMap;
pub use report::{
    build_report, generate_report, AgingBucketSummary, ArReport, RegionGroup, ReportSummary,
};
pub use resolver::{CustomerMapping, CustomerResolver};
pub use store::{InsertOutcome, InvoiceStore, RowFailure};
