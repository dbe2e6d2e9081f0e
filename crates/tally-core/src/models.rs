//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aging bucket an invoice falls into, by days past its due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgingBucket {
    /// Not yet due (zero or negative days overdue)
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "1-45")]
    Days1To45,
    #[serde(rename = "46-90")]
    Days46To90,
    #[serde(rename = "over90")]
    Over90,
}

impl AgingBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Days1To45 => "1-45",
            Self::Days46To90 => "46-90",
            Self::Over90 => "over90",
        }
    }

    /// All buckets, in report order
    pub fn all() -> &'static [AgingBucket] {
        &[
            Self::Current,
            Self::Days1To45,
            Self::Days46To90,
            Self::Over90,
        ]
    }

    /// Human-readable label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Current => "Current (Not Due)",
            Self::Days1To45 => "1-45 Days Overdue",
            Self::Days46To90 => "46-90 Days Overdue",
            Self::Over90 => "90+ Days Overdue",
        }
    }
}

impl std::str::FromStr for AgingBucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "1-45" => Ok(Self::Days1To45),
            "46-90" => Ok(Self::Days46To90),
            "over90" => Ok(Self::Over90),
            _ => Err(format!("Unknown aging bucket: {}", s)),
        }
    }
}

impl std::fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Imported and awaiting payment
    #[default]
    Open,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "paid" => Ok(Self::Paid),
            "void" => Ok(Self::Void),
            _ => Err(format!("Unknown invoice status: {}", s)),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which slice of the aging report to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReportType {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "45days")]
    Days45,
    #[serde(rename = "90days")]
    Days90,
    #[serde(rename = "over90days")]
    Over90Days,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Days45 => "45days",
            Self::Days90 => "90days",
            Self::Over90Days => "over90days",
        }
    }

    /// Buckets included in this report, `None` for no restriction.
    ///
    /// `Days90` includes `1-45`, so it overlaps `Days45`.
    pub fn bucket_filter(&self) -> Option<&'static [AgingBucket]> {
        match self {
            Self::All => None,
            Self::Days45 => Some(&[AgingBucket::Current, AgingBucket::Days1To45]),
            Self::Days90 => Some(&[AgingBucket::Days1To45, AgingBucket::Days46To90]),
            Self::Over90Days => Some(&[AgingBucket::Over90]),
        }
    }

    pub fn includes(&self, bucket: AgingBucket) -> bool {
        self.bucket_filter()
            .map(|buckets| buckets.contains(&bucket))
            .unwrap_or(true)
    }
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "45days" => Ok(Self::Days45),
            "90days" => Ok(Self::Days90),
            "over90days" => Ok(Self::Over90Days),
            _ => Err(format!(
                "Unknown report type: {}. Available: all, 45days, 90days, over90days",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated invoice row decoded from a spreadsheet (before normalization)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCandidate {
    pub customer_external_id: String,
    pub customer_name: String,
    pub invoice_date: NaiveDate,
    pub invoice_number: String,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    /// Taken from the sheet as-is, not recomputed from total - paid
    pub outstanding_amount: Decimal,
    pub sales_person: String,
}

/// A customer, identified by the external ID used in spreadsheets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    /// Single upper-cased character derived from the external ID
    pub region_code: String,
    pub sales_person: String,
    pub created_at: DateTime<Utc>,
}

/// A customer to be created (before DB insertion)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub external_id: String,
    pub name: String,
    pub region_code: String,
    pub sales_person: String,
}

/// An invoice ready for insertion, with derived fields and resolved references
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
    pub customer_external_id: String,
    pub customer_name: String,
    pub sales_person: String,
    pub days_overdue: i64,
    pub aging_bucket: AgingBucket,
    pub status: InvoiceStatus,
    pub customer_ref: i64,
    pub upload_ref: i64,
}

/// A persisted invoice joined with its customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: i64,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
    pub customer_external_id: String,
    pub customer_name: String,
    pub sales_person: String,
    /// Negative when not yet due
    pub days_overdue: i64,
    pub aging_bucket: AgingBucket,
    pub status: InvoiceStatus,
    pub customer_ref: i64,
    pub upload_ref: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer: Customer,
}

/// Processing status of an import batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown import status: {}", s)),
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for a new upload
#[derive(Debug, Clone)]
pub struct NewImportBatch {
    pub file_name: String,
    pub file_size: i64,
    pub uploaded_by: String,
}

/// One spreadsheet upload, kept for traceability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub invoice_count: i64,
    pub error_count: i64,
    pub processing_status: ImportStatus,
    pub created_at: DateTime<Utc>,
}

/// Sort order for invoice listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvoiceSort {
    /// Due date, oldest first
    #[default]
    DueDate,
    /// Outstanding amount, largest first
    Outstanding,
    /// Days overdue, most overdue first
    DaysOverdue,
}

impl std::str::FromStr for InvoiceSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "due-date" | "duedate" => Ok(Self::DueDate),
            "outstanding" => Ok(Self::Outstanding),
            "days-overdue" | "daysoverdue" => Ok(Self::DaysOverdue),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

/// Filters and paging for invoice listings
#[derive(Debug, Clone)]
pub struct InvoiceQuery {
    /// Matches invoice number, customer ID or customer name (case-insensitive)
    pub search: Option<String>,
    /// Region label; expands to every code that shares it
    pub region: Option<String>,
    pub sales_person: Option<String>,
    pub sort: InvoiceSort,
    /// 1-based
    pub page: i64,
    pub per_page: i64,
    /// Reference date for the overdue count
    pub as_of: NaiveDate,
}

impl InvoiceQuery {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            search: None,
            region: None,
            sales_person: None,
            sort: InvoiceSort::default(),
            page: 1,
            per_page: 20,
            as_of,
        }
    }
}

/// Paging metadata for an invoice listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Aggregate figures over every invoice matching a listing's filters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStats {
    pub total_invoices: i64,
    pub total_outstanding: Decimal,
    pub overdue_invoices: i64,
    /// Distinct region labels across all customers, collated
    pub regions: Vec<String>,
    pub sales_persons: Vec<String>,
}

/// One page of invoices plus stats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePage {
    pub invoices: Vec<InvoiceRecord>,
    pub meta: PageMeta,
    pub stats: InvoiceStats,
}

/// Row counts for the stored data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct DataCounts {
    pub invoices: i64,
    pub uploads: i64,
    pub customers: i64,
}
