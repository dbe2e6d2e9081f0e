//! Upload ingestion: workbook bytes to persisted invoices
//!
//! Pipeline: validate upload -> decode rows -> record batch -> resolve
//! customers -> age invoices -> bulk insert -> finalize batch.
//!
//! Failures before the batch is recorded (bad upload, unreadable workbook,
//! no usable rows) abort the whole upload and persist nothing. After that,
//! problems are reported per row in [`IngestResult::errors`].

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::aging::age_invoice;
use crate::error::{Error, Result};
use crate::import::parse_workbook;
use crate::models::{ImportStatus, InvoiceCandidate, InvoiceStatus, NewImportBatch, NewInvoice};
use crate::regions::RegionMap;
use crate::resolver::CustomerResolver;
use crate::store::InvoiceStore;

/// Environment variable overriding the maximum upload size in bytes
pub const MAX_FILE_SIZE_ENV: &str = "TALLY_MAX_FILE_SIZE";

/// Default maximum upload size (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Accepted file name extensions (case-insensitive)
pub const ALLOWED_EXTENSIONS: &[&str] = &[".xlsx", ".xls"];

/// Per-row error message when a customer could not be resolved
pub const MISSING_CUSTOMER_MAPPING: &str = "Missing customer mapping";

/// Upload acceptance limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl UploadLimits {
    /// Limits from `TALLY_MAX_FILE_SIZE`, falling back to the defaults when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var(MAX_FILE_SIZE_ENV) {
            Ok(value) => {
                let max_file_size = value.trim().parse::<u64>().map_err(|_| {
                    Error::Config(format!(
                        "{} must be a byte count, got '{}'",
                        MAX_FILE_SIZE_ENV, value
                    ))
                })?;
                Ok(Self { max_file_size })
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// One upload to ingest
#[derive(Debug, Clone)]
pub struct ImportRequest<'a> {
    /// Original file name; a timestamped name is generated when absent
    pub file_name: Option<String>,
    pub data: &'a [u8],
    pub uploaded_by: String,
    pub limits: UploadLimits,
}

impl<'a> ImportRequest<'a> {
    pub fn new(data: &'a [u8], uploaded_by: impl Into<String>) -> Self {
        Self {
            file_name: None,
            data,
            uploaded_by: uploaded_by.into(),
            limits: UploadLimits::default(),
        }
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// A row that was decoded but not persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestError {
    pub invoice_number: String,
    /// Position among the decoded invoices (0-based)
    pub index: usize,
    pub error: String,
}

/// Outcome of a completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    pub batch_id: i64,
    pub inserted: usize,
    /// Already imported (same customer and invoice number)
    pub skipped: usize,
    pub errors: Vec<IngestError>,
}

/// Check the file name extension and size before decoding anything
pub fn validate_upload(file_name: &str, size: u64, limits: &UploadLimits) -> Result<()> {
    let lower = file_name.to_lowercase();
    if !ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(Error::InvalidUpload(format!(
            "Only Excel files ({}) are allowed, got '{}'",
            ALLOWED_EXTENSIONS.join(", "),
            file_name
        )));
    }
    if size > limits.max_file_size {
        return Err(Error::InvalidUpload(format!(
            "File is {} bytes, the limit is {} bytes",
            size, limits.max_file_size
        )));
    }
    Ok(())
}

/// File name used when the caller supplies none
pub fn default_file_name(now: NaiveDateTime) -> String {
    format!("upload-{}.xlsx", now.format("%Y%m%d-%H%M%S"))
}

/// Ingest one workbook upload
///
/// `now` is the reference time for days-overdue; pass the same value to
/// reproduce a run.
pub fn ingest_workbook<S: InvoiceStore + ?Sized>(
    store: &S,
    regions: &RegionMap,
    request: ImportRequest<'_>,
    now: NaiveDateTime,
) -> Result<IngestResult> {
    let file_name = request
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default_file_name(now));
    let file_size = request.data.len() as u64;

    validate_upload(&file_name, file_size, &request.limits)?;

    let candidates = parse_workbook(request.data)?;
    if candidates.is_empty() {
        return Err(Error::NoInvoices);
    }

    let batch_id = store.create_import_batch(&NewImportBatch {
        file_name: file_name.clone(),
        file_size: file_size as i64,
        uploaded_by: request.uploaded_by.clone(),
    })?;

    match persist_candidates(store, regions, &candidates, batch_id, now) {
        Ok(result) => {
            store.complete_import_batch(
                batch_id,
                ImportStatus::Completed,
                result.inserted as i64,
                result.errors.len() as i64,
            )?;
            info!(
                batch_id,
                file = %file_name,
                inserted = result.inserted,
                skipped = result.skipped,
                errors = result.errors.len(),
                "Import completed"
            );
            Ok(result)
        }
        Err(e) => {
            if let Err(mark_err) =
                store.complete_import_batch(batch_id, ImportStatus::Failed, 0, 0)
            {
                warn!(batch_id, error = %mark_err, "Could not mark import batch as failed");
            }
            Err(e)
        }
    }
}

fn persist_candidates<S: InvoiceStore + ?Sized>(
    store: &S,
    regions: &RegionMap,
    candidates: &[InvoiceCandidate],
    batch_id: i64,
    now: NaiveDateTime,
) -> Result<IngestResult> {
    let mapping = CustomerResolver::new(store, regions).resolve(candidates)?;

    let mut errors = Vec::new();
    // Candidate index for each invoice handed to the store
    let mut positions = Vec::with_capacity(candidates.len());
    let mut invoices = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        let Some(customer_ref) = mapping.get(&candidate.customer_external_id) else {
            errors.push(IngestError {
                invoice_number: candidate.invoice_number.clone(),
                index,
                error: MISSING_CUSTOMER_MAPPING.to_string(),
            });
            continue;
        };

        positions.push(index);
        invoices.push(new_invoice(candidate, customer_ref, batch_id, now));
    }

    let outcome = store.bulk_insert_invoices(&invoices)?;

    for failure in &outcome.failed {
        let index = positions[failure.index];
        errors.push(IngestError {
            invoice_number: candidates[index].invoice_number.clone(),
            index,
            error: failure.error.clone(),
        });
    }
    errors.sort_by_key(|e| e.index);

    Ok(IngestResult {
        batch_id,
        inserted: outcome.succeeded.len(),
        skipped: outcome.skipped.len(),
        errors,
    })
}

fn new_invoice(
    candidate: &InvoiceCandidate,
    customer_ref: i64,
    upload_ref: i64,
    now: NaiveDateTime,
) -> NewInvoice {
    let aging = age_invoice(candidate, now);
    NewInvoice {
        invoice_number: candidate.invoice_number.clone(),
        invoice_date: candidate.invoice_date,
        due_date: candidate.due_date,
        total_amount: candidate.total_amount,
        paid_amount: candidate.paid_amount,
        outstanding_amount: candidate.outstanding_amount,
        customer_external_id: candidate.customer_external_id.clone(),
        customer_name: candidate.customer_name.clone(),
        sales_person: candidate.sales_person.clone(),
        days_overdue: aging.days_overdue,
        aging_bucket: aging.bucket,
        status: InvoiceStatus::Open,
        customer_ref,
        upload_ref,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{AgingBucket, Customer, NewCustomer};
    use crate::test_utils::{InvoiceRow, WorkbookBuilder};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn sample_workbook() -> Vec<u8> {
        WorkbookBuilder::new()
            .header()
            .invoice(
                InvoiceRow::new("R1234", "INV-001", "2024-03-01", "2024-05-22")
                    .name("Southern Supply")
                    .amounts(1000.0, 0.0, 1000.0)
                    .sales_person("Somchai"),
            )
            .invoice(
                InvoiceRow::new("R1234", "INV-002", "2024-04-01", "2024-06-30")
                    .name("Southern Supply")
                    .outstanding(250.0)
                    .sales_person("Somchai"),
            )
            .invoice(
                InvoiceRow::new("A0001", "INV-003", "2024-01-01", "2024-01-31")
                    .name("Bangkok Trading")
                    .amounts(800.0, 300.0, 500.0),
            )
            .build()
    }

    #[test]
    fn test_report_after_ingesting_huge_amount() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = WorkbookBuilder::new()
            .header()
            .invoice(
                InvoiceRow::new("R1234", "INV-BIG", "2024-03-01", "2024-05-22").outstanding(1e27),
            )
            .invoice(
                InvoiceRow::new("R1234", "INV-SMALL", "2024-01-01", "2024-01-31")
                    .outstanding(1000.0),
            )
            .build();

        let request = ImportRequest::new(&data, "tester");
        let result = ingest_workbook(&db, &regions, request, now()).unwrap();
        assert_eq!(result.inserted, 2);

        let report =
            crate::report::generate_report(&db, &regions, crate::models::ReportType::All, now())
                .unwrap();
        assert_eq!(report.total_invoices, 2);
        let percentages: Vec<i64> = report
            .overall_summary
            .aging_buckets
            .iter()
            .map(|b| b.percentage)
            .collect();
        assert_eq!(percentages, vec![100, 0]);
    }

    #[test]
    fn test_ingest_workbook() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = sample_workbook();

        let request = ImportRequest::new(&data, "ar@example.com").file_name("june.xlsx");
        let result = ingest_workbook(&db, &regions, request, now()).unwrap();

        assert_eq!(result.inserted, 3);
        assert_eq!(result.skipped, 0);
        assert!(result.errors.is_empty());

        let batch = db.get_import_batch(result.batch_id).unwrap().unwrap();
        assert_eq!(batch.file_name, "june.xlsx");
        assert_eq!(batch.file_size, data.len() as i64);
        assert_eq!(batch.uploaded_by, "ar@example.com");
        assert_eq!(batch.invoice_count, 3);
        assert_eq!(batch.error_count, 0);
        assert_eq!(batch.processing_status, ImportStatus::Completed);

        let records = db.query_invoices(None).unwrap();
        assert_eq!(records.len(), 3);

        // Ordered by region code then due date: A before R
        assert_eq!(records[0].invoice_number, "INV-003");
        assert_eq!(records[0].days_overdue, 122);
        assert_eq!(records[0].aging_bucket, AgingBucket::Over90);

        assert_eq!(records[1].invoice_number, "INV-001");
        assert_eq!(records[1].days_overdue, 10);
        assert_eq!(records[1].aging_bucket, AgingBucket::Days1To45);

        assert_eq!(records[2].invoice_number, "INV-002");
        assert_eq!(records[2].days_overdue, -29);
        assert_eq!(records[2].aging_bucket, AgingBucket::Current);

        for record in &records {
            assert_eq!(record.upload_ref, result.batch_id);
            assert_eq!(record.status, InvoiceStatus::Open);
        }

        let customer = db.get_customer_by_external_id("A0001").unwrap().unwrap();
        assert_eq!(customer.sales_person, "N/A");
        assert_eq!(customer.region_code, "A");
    }

    #[test]
    fn test_reimport_skips_duplicates_and_reuses_customers() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = sample_workbook();

        ingest_workbook(&db, &regions, ImportRequest::new(&data, "a"), now()).unwrap();
        let second = ingest_workbook(&db, &regions, ImportRequest::new(&data, "b"), now()).unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 3);
        assert!(second.errors.is_empty());

        let counts = db.data_counts().unwrap();
        assert_eq!(counts.invoices, 3);
        assert_eq!(counts.customers, 2);
        assert_eq!(counts.uploads, 2);
    }

    #[test]
    fn test_default_file_name() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = sample_workbook();

        let result = ingest_workbook(&db, &regions, ImportRequest::new(&data, "a"), now()).unwrap();
        let batch = db.get_import_batch(result.batch_id).unwrap().unwrap();
        assert_eq!(batch.file_name, "upload-20240601-093000.xlsx");
    }

    #[test]
    fn test_rejects_wrong_extension_without_recording_batch() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = sample_workbook();

        let request = ImportRequest::new(&data, "a").file_name("invoices.csv");
        let err = ingest_workbook(&db, &regions, request, now()).unwrap_err();
        assert!(matches!(err, Error::InvalidUpload(_)));
        assert_eq!(db.data_counts().unwrap().uploads, 0);
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = sample_workbook();

        let request = ImportRequest::new(&data, "a")
            .file_name("big.XLSX")
            .limits(UploadLimits { max_file_size: 16 });
        let err = ingest_workbook(&db, &regions, request, now()).unwrap_err();
        assert!(matches!(err, Error::InvalidUpload(_)));
    }

    #[test]
    fn test_validate_upload() {
        let limits = UploadLimits::default();
        assert!(validate_upload("a.xlsx", 10, &limits).is_ok());
        assert!(validate_upload("A.XLS", 10, &limits).is_ok());
        assert!(validate_upload("a.ods", 10, &limits).is_err());
        assert!(validate_upload("xlsx", 10, &limits).is_err());
        assert!(validate_upload("a.xlsx", DEFAULT_MAX_FILE_SIZE, &limits).is_ok());
        assert!(validate_upload("a.xlsx", DEFAULT_MAX_FILE_SIZE + 1, &limits).is_err());
    }

    #[test]
    fn test_no_invoices_is_fatal() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = WorkbookBuilder::new()
            .header()
            .invoice(InvoiceRow::new(".", "X", "2024-01-01", "2024-01-01"))
            .build();

        let err = ingest_workbook(&db, &regions, ImportRequest::new(&data, "a"), now()).unwrap_err();
        assert!(matches!(err, Error::NoInvoices));
        assert_eq!(err.to_string(), "No invoices found in file");
        assert_eq!(db.data_counts().unwrap().uploads, 0);
    }

    #[test]
    fn test_unreadable_workbook_is_fatal() {
        let db = Database::in_memory().unwrap();
        let regions = RegionMap::embedded().unwrap();
        let data = b"this is not a spreadsheet".to_vec();

        let request = ImportRequest::new(&data, "a").file_name("broken.xlsx");
        let err = ingest_workbook(&db, &regions, request, now()).unwrap_err();
        assert!(matches!(err, Error::Spreadsheet(_)));
        assert_eq!(db.data_counts().unwrap().uploads, 0);
    }

    /// Store whose customer table never yields a mapping
    struct NoCustomerStore(Database);

    impl InvoiceStore for NoCustomerStore {
        fn find_customers_by_external_ids(
            &self,
            _external_ids: &[String],
        ) -> Result<HashMap<String, Customer>> {
            Ok(HashMap::new())
        }

        fn create_customers(&self, _customers: &[NewCustomer]) -> Result<usize> {
            Ok(0)
        }

        fn bulk_insert_invoices(
            &self,
            invoices: &[NewInvoice],
        ) -> Result<crate::store::InsertOutcome> {
            self.0.bulk_insert_invoices(invoices)
        }

        fn query_invoices(
            &self,
            buckets: Option<&[AgingBucket]>,
        ) -> Result<Vec<crate::models::InvoiceRecord>> {
            self.0.query_invoices(buckets)
        }

        fn create_import_batch(&self, batch: &NewImportBatch) -> Result<i64> {
            self.0.create_import_batch(batch)
        }

        fn complete_import_batch(
            &self,
            batch_id: i64,
            status: ImportStatus,
            invoice_count: i64,
            error_count: i64,
        ) -> Result<()> {
            self.0
                .complete_import_batch(batch_id, status, invoice_count, error_count)
        }

        fn get_import_batch(&self, batch_id: i64) -> Result<Option<crate::models::ImportBatch>> {
            self.0.get_import_batch(batch_id)
        }
    }

    #[test]
    fn test_missing_customer_mapping_is_a_row_error() {
        let store = NoCustomerStore(Database::in_memory().unwrap());
        let regions = RegionMap::embedded().unwrap();
        let data = sample_workbook();

        let result = ingest_workbook(&store, &regions, ImportRequest::new(&data, "a"), now()).unwrap();
        assert_eq!(result.inserted, 0);
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.errors[0].invoice_number, "INV-001");
        assert_eq!(result.errors[0].index, 0);
        assert_eq!(result.errors[2].index, 2);
        assert!(result
            .errors
            .iter()
            .all(|e| e.error == MISSING_CUSTOMER_MAPPING));

        let batch = store.get_import_batch(result.batch_id).unwrap().unwrap();
        assert_eq!(batch.processing_status, ImportStatus::Completed);
        assert_eq!(batch.error_count, 3);
        assert_eq!(store.0.data_counts().unwrap().invoices, 0);
    }

    #[test]
    fn test_ingest_result_json_keys() {
        let result = IngestResult {
            batch_id: 7,
            inserted: 2,
            skipped: 1,
            errors: vec![IngestError {
                invoice_number: "INV-9".into(),
                index: 4,
                error: MISSING_CUSTOMER_MAPPING.into(),
            }],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["batchId"], 7);
        assert_eq!(json["errors"][0]["invoiceNumber"], "INV-9");
        assert_eq!(json["errors"][0]["index"], 4);
    }
}
