//! `InvoiceStore` implementation backed by SQLite

use std::collections::HashMap;

use super::Database;
use crate::error::Result;
use crate::models::{
    AgingBucket, Customer, ImportBatch, ImportStatus, InvoiceRecord, NewCustomer, NewImportBatch,
    NewInvoice,
};
use crate::store::{InsertOutcome, InvoiceStore};

impl InvoiceStore for Database {
    fn find_customers_by_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<HashMap<String, Customer>> {
        Database::find_customers_by_external_ids(self, external_ids)
    }

    fn create_customers(&self, customers: &[NewCustomer]) -> Result<usize> {
        Database::create_customers(self, customers)
    }

    fn bulk_insert_invoices(&self, invoices: &[NewInvoice]) -> Result<InsertOutcome> {
        Database::bulk_insert_invoices(self, invoices)
    }

    fn query_invoices(&self, buckets: Option<&[AgingBucket]>) -> Result<Vec<InvoiceRecord>> {
        Database::query_invoices(self, buckets)
    }

    fn create_import_batch(&self, batch: &NewImportBatch) -> Result<i64> {
        Database::create_import_batch(self, batch)
    }

    fn complete_import_batch(
        &self,
        batch_id: i64,
        status: ImportStatus,
        invoice_count: i64,
        error_count: i64,
    ) -> Result<()> {
        Database::complete_import_batch(self, batch_id, status, invoice_count, error_count)
    }

    fn get_import_batch(&self, batch_id: i64) -> Result<Option<ImportBatch>> {
        Database::get_import_batch(self, batch_id)
    }
}
