//! Record store abstraction used by the ingestion pipeline and reports
//!
//! The pipeline never talks to SQLite directly; it goes through
//! [`InvoiceStore`]. [`crate::db::Database`] is the shipped implementation.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::models::{
    AgingBucket, Customer, ImportBatch, ImportStatus, InvoiceRecord, NewCustomer, NewImportBatch,
    NewInvoice,
};

/// A row that could not be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// Index into the slice passed to `bulk_insert_invoices`
    pub index: usize,
    pub error: String,
}

/// Per-row result of a bulk insert
///
/// Every input index appears in exactly one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub succeeded: Vec<usize>,
    /// Already present (same customer and invoice number)
    pub skipped: Vec<usize>,
    pub failed: Vec<RowFailure>,
}

impl InsertOutcome {
    pub fn inserted_count(&self) -> usize {
        self.succeeded.len()
    }
}

/// Persistence contract for customers, invoices and import batches
pub trait InvoiceStore: Send + Sync {
    /// Existing customers keyed by external ID; unknown IDs are absent
    fn find_customers_by_external_ids(&self, external_ids: &[String])
        -> Result<HashMap<String, Customer>>;

    /// Create customers, ignoring any whose external ID already exists.
    ///
    /// Returns how many rows were actually created.
    fn create_customers(&self, customers: &[NewCustomer]) -> Result<usize>;

    /// Insert all invoices atomically, falling back to row-by-row on failure
    fn bulk_insert_invoices(&self, invoices: &[NewInvoice]) -> Result<InsertOutcome>;

    /// Invoices joined with their customer, ordered by region code then due date.
    ///
    /// `None` means every bucket.
    fn query_invoices(&self, buckets: Option<&[AgingBucket]>) -> Result<Vec<InvoiceRecord>>;

    fn create_import_batch(&self, batch: &NewImportBatch) -> Result<i64>;

    fn complete_import_batch(
        &self,
        batch_id: i64,
        status: ImportStatus,
        invoice_count: i64,
        error_count: i64,
    ) -> Result<()>;

    fn get_import_batch(&self, batch_id: i64) -> Result<Option<ImportBatch>>;
}
