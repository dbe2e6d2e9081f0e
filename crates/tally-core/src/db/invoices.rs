//! Invoice operations

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Statement, ToSql};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::invoice_filter::{InvoiceFilter, RegionCodes};
use super::{date_column, decimal_column, enum_column, parse_datetime, Database};
use crate::aging::days_overdue;
use crate::error::Result;
use crate::models::{
    AgingBucket, Customer, InvoicePage, InvoiceQuery, InvoiceRecord, InvoiceStats, NewInvoice,
    PageMeta,
};
use crate::regions::{sort_labels, RegionMap};
use crate::report::sum_amounts;
use crate::store::{InsertOutcome, RowFailure};

const INSERT_INVOICE_SQL: &str = r#"
    INSERT INTO invoices (
        invoice_number, invoice_date, due_date,
        total_amount, paid_amount, outstanding_amount,
        customer_external_id, customer_name, sales_person,
        days_overdue, aging_bucket, status, customer_id, upload_id
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(customer_id, invoice_number) DO NOTHING
"#;

/// Invoice columns (0..=16) followed by the joined customer (17..=22)
const RECORD_COLUMNS: &str = r#"
    i.id, i.invoice_number, i.invoice_date, i.due_date,
    i.total_amount, i.paid_amount, i.outstanding_amount,
    i.customer_external_id, i.customer_name, i.sales_person,
    i.days_overdue, i.aging_bucket, i.status, i.customer_id, i.upload_id,
    i.created_at, i.updated_at,
    c.id, c.external_id, c.name, c.region_code, c.sales_person, c.created_at
"#;

const RECORD_FROM: &str = "FROM invoices i JOIN customers c ON c.id = i.customer_id";

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvoiceRecord> {
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;
    let customer_created_str: String = row.get(22)?;

    Ok(InvoiceRecord {
        id: row.get(0)?,
        invoice_number: row.get(1)?,
        invoice_date: date_column(row, 2)?,
        due_date: date_column(row, 3)?,
        total_amount: decimal_column(row, 4)?,
        paid_amount: decimal_column(row, 5)?,
        outstanding_amount: decimal_column(row, 6)?,
        customer_external_id: row.get(7)?,
        customer_name: row.get(8)?,
        sales_person: row.get(9)?,
        days_overdue: row.get(10)?,
        aging_bucket: enum_column(row, 11)?,
        status: enum_column(row, 12)?,
        customer_ref: row.get(13)?,
        upload_ref: row.get(14)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
        customer: Customer {
            id: row.get(17)?,
            external_id: row.get(18)?,
            name: row.get(19)?,
            region_code: row.get(20)?,
            sales_person: row.get(21)?,
            created_at: parse_datetime(&customer_created_str),
        },
    })
}

fn insert_invoice(stmt: &mut Statement<'_>, invoice: &NewInvoice) -> rusqlite::Result<usize> {
    stmt.execute(params![
        invoice.invoice_number,
        invoice.invoice_date.to_string(),
        invoice.due_date.to_string(),
        invoice.total_amount.to_string(),
        invoice.paid_amount.to_string(),
        invoice.outstanding_amount.to_string(),
        invoice.customer_external_id,
        invoice.customer_name,
        invoice.sales_person,
        invoice.days_overdue,
        invoice.aging_bucket.as_str(),
        invoice.status.as_str(),
        invoice.customer_ref,
        invoice.upload_ref,
    ])
}

/// All rows in one transaction; any error rolls the whole batch back
fn insert_in_transaction(
    conn: &mut Connection,
    invoices: &[NewInvoice],
) -> rusqlite::Result<InsertOutcome> {
    let tx = conn.transaction()?;
    let mut outcome = InsertOutcome::default();
    {
        let mut stmt = tx.prepare(INSERT_INVOICE_SQL)?;
        for (index, invoice) in invoices.iter().enumerate() {
            if insert_invoice(&mut stmt, invoice)? == 0 {
                outcome.skipped.push(index);
            } else {
                outcome.succeeded.push(index);
            }
        }
    }
    tx.commit()?;
    Ok(outcome)
}

/// Each row on its own, collecting per-row failures
/// Pages needed for `total` rows; never overflows for large `per_page`
fn page_count(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total - 1) / per_page + 1
    }
}

fn insert_row_by_row(conn: &Connection, invoices: &[NewInvoice]) -> Result<InsertOutcome> {
    let mut stmt = conn.prepare(INSERT_INVOICE_SQL)?;
    let mut outcome = InsertOutcome::default();

    for (index, invoice) in invoices.iter().enumerate() {
        match insert_invoice(&mut stmt, invoice) {
            Ok(0) => outcome.skipped.push(index),
            Ok(_) => outcome.succeeded.push(index),
            Err(e) => {
                warn!(
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "Failed to insert invoice"
                );
                outcome.failed.push(RowFailure {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(outcome)
}

impl Database {
    /// Insert invoices atomically, falling back to row-by-row inserts on failure
    ///
    /// Invoices already present for the same customer and invoice number are
    /// reported as skipped.
    pub fn bulk_insert_invoices(&self, invoices: &[NewInvoice]) -> Result<InsertOutcome> {
        if invoices.is_empty() {
            return Ok(InsertOutcome::default());
        }

        let mut conn = self.conn()?;
        match insert_in_transaction(&mut conn, invoices) {
            Ok(outcome) => {
                debug!(
                    inserted = outcome.succeeded.len(),
                    skipped = outcome.skipped.len(),
                    "Bulk invoice insert committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    count = invoices.len(),
                    "Bulk invoice insert failed, retrying row by row"
                );
                insert_row_by_row(&conn, invoices)
            }
        }
    }

    /// Invoices joined with their customer, ordered by region code, due date, then ID
    ///
    /// `None` returns every bucket; an empty slice returns nothing.
    pub fn query_invoices(&self, buckets: Option<&[AgingBucket]>) -> Result<Vec<InvoiceRecord>> {
        let (where_clause, bucket_params): (String, Vec<&'static str>) = match buckets {
            None => (String::new(), Vec::new()),
            Some([]) => return Ok(Vec::new()),
            Some(buckets) => (
                format!(
                    "WHERE i.aging_bucket IN ({})",
                    vec!["?"; buckets.len()].join(", ")
                ),
                buckets.iter().map(AgingBucket::as_str).collect(),
            ),
        };

        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} {} {} ORDER BY c.region_code, i.due_date, i.id",
            RECORD_COLUMNS, RECORD_FROM, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(bucket_params), row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Get one invoice by ID
    pub fn get_invoice(&self, id: i64) -> Result<Option<InvoiceRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} {} WHERE i.id = ?", RECORD_COLUMNS, RECORD_FROM),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Filtered, sorted, paginated invoice listing with aggregate stats
    ///
    /// Overdue figures are recomputed against `query.as_of` rather than read
    /// from the values stored at import time.
    pub fn list_invoices(&self, query: &InvoiceQuery, regions: &RegionMap) -> Result<InvoicePage> {
        let per_page = query.per_page.max(1);
        let page = query.page.max(1);

        let region = query.region.as_deref().map(|label| {
            if regions.is_default_label(label) {
                RegionCodes::NotIn(regions.codes().collect())
            } else {
                RegionCodes::In(regions.codes_for_label(label))
            }
        });

        let filter = InvoiceFilter::new()
            .search(query.search.as_deref())
            .region(region)
            .sales_person(query.sales_person.as_deref())
            .sort(query.sort)
            .build();

        let conn = self.conn()?;
        let filter_params: Vec<&dyn ToSql> = filter.params.iter().map(|p| p.as_ref()).collect();

        // Stats over every matching row, not just this page
        let amounts = {
            let mut stmt = conn.prepare(&format!(
                "SELECT i.outstanding_amount, i.due_date {} {}",
                RECORD_FROM, filter.where_clause
            ))?;
            let rows = stmt
                .query_map(filter_params.as_slice(), |row| {
                    Ok((decimal_column(row, 0)?, date_column(row, 1)?))
                })?
                .collect::<std::result::Result<Vec<(Decimal, NaiveDate)>, _>>()?;
            rows
        };

        let total = amounts.len() as i64;
        let total_outstanding = sum_amounts(amounts.iter().map(|(amount, _)| *amount));
        let overdue_invoices = amounts
            .iter()
            .filter(|(_, due)| {
                AgingBucket::from_days_overdue(days_overdue(*due, query.as_of))
                    != AgingBucket::Current
            })
            .count() as i64;

        let offset = (page - 1).saturating_mul(per_page);
        let mut page_params = filter_params.clone();
        page_params.push(&per_page);
        page_params.push(&offset);

        let sql = format!(
            "SELECT {} {} {} {} LIMIT ? OFFSET ?",
            RECORD_COLUMNS, RECORD_FROM, filter.where_clause, filter.order_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let invoices = stmt
            .query_map(page_params.as_slice(), row_to_record)?
            .map(|record| {
                record.map(|mut record| {
                    record.days_overdue = days_overdue(record.due_date, query.as_of);
                    record.aging_bucket = AgingBucket::from_days_overdue(record.days_overdue);
                    record
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let stats = InvoiceStats {
            total_invoices: total,
            total_outstanding,
            overdue_invoices,
            regions: self.region_labels(regions)?,
            sales_persons: self.sales_persons()?,
        };

        Ok(InvoicePage {
            invoices,
            meta: PageMeta {
                page,
                per_page,
                total,
                total_pages: page_count(total, per_page),
            },
            stats,
        })
    }

    /// Distinct region labels across all customers, collated
    pub fn region_labels(&self, regions: &RegionMap) -> Result<Vec<String>> {
        let labels: BTreeSet<String> = self
            .customer_region_codes()?
            .iter()
            .map(|code| regions.label(code).to_string())
            .collect();
        let mut labels: Vec<String> = labels.into_iter().collect();
        sort_labels(&mut labels);
        Ok(labels)
    }

    /// Distinct non-empty sales persons on invoices, sorted
    pub fn sales_persons(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT sales_person FROM invoices WHERE sales_person != '' ORDER BY sales_person",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}
