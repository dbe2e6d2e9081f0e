//! Spreadsheet row decoder
//!
//! Reads the first sheet of an invoice workbook (xlsx, xls or ods) and turns
//! each row into either a validated [`InvoiceCandidate`] or a rejection with
//! a reason. Columns are fixed by position:
//!
//! | col | field                 |
//! |-----|-----------------------|
//! | A   | customer external ID  |
//! | B   | customer name         |
//! | C   | invoice date          |
//! | D   | (unused)              |
//! | E   | invoice number        |
//! | F   | due date              |
//! | G   | total amount          |
//! | H   | paid amount           |
//! | I   | outstanding amount    |
//! | J   | sales person          |
//!
//! Header and summary rows need no special handling: they fail validation
//! like any other malformed row.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::InvoiceCandidate;

/// Customer IDs that mark filler or subtotal rows rather than real customers
pub const EXCLUDED_CUSTOMER_IDS: &[&str] = &[".", "1", "8JB001"];

pub const COL_CUSTOMER_ID: usize = 0;
pub const COL_CUSTOMER_NAME: usize = 1;
pub const COL_INVOICE_DATE: usize = 2;
pub const COL_INVOICE_NUMBER: usize = 4;
pub const COL_DUE_DATE: usize = 5;
pub const COL_TOTAL: usize = 6;
pub const COL_PAID: usize = 7;
pub const COL_OUTSTANDING: usize = 8;
pub const COL_SALES_PERSON: usize = 9;

/// Number of columns read per row
pub const COLUMN_COUNT: usize = 10;

/// Calendar formats accepted for string dates, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", // 2024-01-15
    "%m/%d/%Y", // 01/15/2024
    "%m/%d/%y", // 01/15/24
    "%d/%m/%Y", // 15/01/2024
    "%Y/%m/%d", // 2024/01/15
    "%m-%d-%Y", // 01-15-2024
];

/// Datetime formats accepted for string dates (the time part is dropped)
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Serial day 0 in the 1900 date system (compensates for the 1900 leap-year bug)
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial that still lands on a four-digit year (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

static EMPTY_CELL: Data = Data::Empty;

/// Why a row was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingCustomerId,
    ExcludedCustomerId(String),
    MissingInvoiceNumber,
    InvalidInvoiceDate,
    InvalidDueDate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCustomerId => write!(f, "missing customer ID"),
            Self::ExcludedCustomerId(id) => write!(f, "excluded customer ID '{}'", id),
            Self::MissingInvoiceNumber => write!(f, "missing invoice number"),
            Self::InvalidInvoiceDate => write!(f, "missing or invalid invoice date"),
            Self::InvalidDueDate => write!(f, "missing or invalid due date"),
        }
    }
}

/// Decoding result for one sheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Accepted(InvoiceCandidate),
    Rejected {
        /// 1-based sheet row number
        row: usize,
        reason: RejectReason,
    },
}

impl RowOutcome {
    pub fn accepted(&self) -> Option<&InvoiceCandidate> {
        match self {
            Self::Accepted(candidate) => Some(candidate),
            Self::Rejected { .. } => None,
        }
    }

    pub fn into_accepted(self) -> Option<InvoiceCandidate> {
        match self {
            Self::Accepted(candidate) => Some(candidate),
            Self::Rejected { .. } => None,
        }
    }
}

/// Decode every row of the workbook's first sheet
///
/// Fails only when the buffer is not a readable workbook or has no sheet.
pub fn decode_workbook(data: &[u8]) -> Result<Vec<RowOutcome>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(calamine::Error::Msg("Workbook has no sheets"))??;

    let (first_row, last_row) = match (range.start(), range.end()) {
        (Some((start, _)), Some((end, _))) => (start, end),
        _ => return Ok(Vec::new()),
    };

    let mut outcomes = Vec::with_capacity((last_row - first_row + 1) as usize);
    for row in first_row..=last_row {
        let cells: Vec<Data> = (0..COLUMN_COUNT as u32)
            .map(|col| range.get_value((row, col)).cloned().unwrap_or(Data::Empty))
            .collect();
        let outcome = decode_row(row as usize + 1, &cells);
        if let RowOutcome::Rejected { row, reason } = &outcome {
            debug!(row, %reason, "Skipping spreadsheet row");
        }
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Decode the workbook and keep only the valid invoice rows
pub fn parse_workbook(data: &[u8]) -> Result<Vec<InvoiceCandidate>> {
    let outcomes = decode_workbook(data)?;
    let total = outcomes.len();
    let candidates: Vec<InvoiceCandidate> = outcomes
        .into_iter()
        .filter_map(RowOutcome::into_accepted)
        .collect();

    info!(
        rows = total,
        accepted = candidates.len(),
        rejected = total - candidates.len(),
        "Decoded invoice workbook"
    );
    Ok(candidates)
}

/// Validate one row of cells (absolute columns, missing cells count as empty)
///
/// Checks run in order: customer ID, invoice number, invoice date, due date.
pub fn decode_row(row: usize, cells: &[Data]) -> RowOutcome {
    let cell = |col: usize| cells.get(col).unwrap_or(&EMPTY_CELL);
    let reject = |reason| RowOutcome::Rejected { row, reason };

    let customer_external_id = cell_string(cell(COL_CUSTOMER_ID));
    if customer_external_id.is_empty() {
        return reject(RejectReason::MissingCustomerId);
    }
    if EXCLUDED_CUSTOMER_IDS.contains(&customer_external_id.as_str()) {
        return reject(RejectReason::ExcludedCustomerId(customer_external_id));
    }

    let invoice_number = cell_string(cell(COL_INVOICE_NUMBER));
    if invoice_number.is_empty() {
        return reject(RejectReason::MissingInvoiceNumber);
    }

    let Some(invoice_date) = cell_date(cell(COL_INVOICE_DATE)) else {
        return reject(RejectReason::InvalidInvoiceDate);
    };
    let Some(due_date) = cell_date(cell(COL_DUE_DATE)) else {
        return reject(RejectReason::InvalidDueDate);
    };

    RowOutcome::Accepted(InvoiceCandidate {
        customer_external_id,
        customer_name: cell_string(cell(COL_CUSTOMER_NAME)),
        invoice_date,
        invoice_number,
        due_date,
        total_amount: cell_decimal(cell(COL_TOTAL)),
        paid_amount: cell_decimal(cell(COL_PAID)),
        outstanding_amount: cell_decimal(cell(COL_OUTSTANDING)),
        sales_person: cell_string(cell(COL_SALES_PERSON)),
    })
}

/// Cell as trimmed text; numbers render without a trailing `.0`
fn cell_string(data: &Data) -> String {
    match data {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Empty | Data::Error(_) => String::new(),
    }
}

/// Cell as an amount; anything unparsable is zero
fn cell_decimal(data: &Data) -> Decimal {
    match data {
        Data::Float(f) => float_to_decimal(*f),
        Data::Int(i) => Decimal::from(*i),
        Data::String(s) => parse_amount(s),
        _ => Decimal::ZERO,
    }
}

/// Cell as a calendar date, if it holds one
fn cell_date(data: &Data) -> Option<NaiveDate> {
    match data {
        Data::Float(f) => serial_to_date(*f),
        Data::Int(i) => serial_to_date(*i as f64),
        Data::DateTime(dt) => serial_to_date(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) => parse_date_str(s),
        _ => None,
    }
}

fn float_to_decimal(f: f64) -> Decimal {
    if !f.is_finite() {
        return Decimal::ZERO;
    }
    // Shortest round-trip text keeps 1234.56 from becoming 1234.5599999...
    Decimal::from_str(&f.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(f))
        .unwrap_or(Decimal::ZERO)
}

/// Convert a spreadsheet serial day number to a date; the fraction (time) is discarded
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Parse a date string in one of the accepted formats
///
/// Calendar formats yielding a year before 1900 are skipped, so `01/15/24`
/// falls through `%m/%d/%Y` to `%m/%d/%y`.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if date.year() >= 1900 {
                return Some(date);
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Parse an amount string; thousands separators and whitespace are ignored
///
/// Returns zero for anything that is not a number.
pub fn parse_amount(s: &str) -> Decimal {
    let cleaned: String = s
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::{serial, InvoiceRow, WorkbookBuilder};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn valid_row() -> Vec<Data> {
        vec![
            s("R1234"),
            s("Southern Supply"),
            s("2024-01-15"),
            Data::Empty,
            s("INV-001"),
            s("2024-02-14"),
            Data::Float(1500.0),
            Data::Float(500.0),
            Data::Float(1000.0),
            s("Somchai"),
        ]
    }

    fn rejected(outcome: RowOutcome) -> RejectReason {
        match outcome {
            RowOutcome::Rejected { reason, .. } => reason,
            RowOutcome::Accepted(c) => panic!("expected rejection, got {:?}", c),
        }
    }

    #[test]
    fn test_decode_row_accepts_valid_row() {
        let outcome = decode_row(2, &valid_row());
        let candidate = outcome.accepted().unwrap();
        assert_eq!(candidate.customer_external_id, "R1234");
        assert_eq!(candidate.customer_name, "Southern Supply");
        assert_eq!(candidate.invoice_date, date(2024, 1, 15));
        assert_eq!(candidate.invoice_number, "INV-001");
        assert_eq!(candidate.due_date, date(2024, 2, 14));
        assert_eq!(candidate.total_amount, dec("1500"));
        assert_eq!(candidate.paid_amount, dec("500"));
        assert_eq!(candidate.outstanding_amount, dec("1000"));
        assert_eq!(candidate.sales_person, "Somchai");
    }

    #[test]
    fn test_excluded_customer_ids() {
        for id in [".", "1", "8JB001"] {
            let mut row = valid_row();
            row[COL_CUSTOMER_ID] = s(id);
            assert_eq!(
                rejected(decode_row(5, &row)),
                RejectReason::ExcludedCustomerId(id.to_string())
            );
        }

        // Numeric cell 1 renders as "1" and is excluded too
        let mut row = valid_row();
        row[COL_CUSTOMER_ID] = Data::Float(1.0);
        assert!(matches!(
            rejected(decode_row(5, &row)),
            RejectReason::ExcludedCustomerId(_)
        ));
    }

    #[test]
    fn test_required_fields_in_check_order() {
        let mut row = valid_row();
        row[COL_CUSTOMER_ID] = s("   ");
        row[COL_INVOICE_NUMBER] = Data::Empty;
        assert_eq!(rejected(decode_row(3, &row)), RejectReason::MissingCustomerId);

        let mut row = valid_row();
        row[COL_INVOICE_NUMBER] = Data::Empty;
        row[COL_INVOICE_DATE] = s("not a date");
        assert_eq!(
            rejected(decode_row(3, &row)),
            RejectReason::MissingInvoiceNumber
        );

        let mut row = valid_row();
        row[COL_INVOICE_DATE] = s("not a date");
        row[COL_DUE_DATE] = Data::Empty;
        assert_eq!(
            rejected(decode_row(3, &row)),
            RejectReason::InvalidInvoiceDate
        );

        let mut row = valid_row();
        row[COL_DUE_DATE] = Data::Empty;
        assert_eq!(rejected(decode_row(3, &row)), RejectReason::InvalidDueDate);
    }

    #[test]
    fn test_optional_fields_default() {
        let mut row = valid_row();
        row[COL_CUSTOMER_NAME] = Data::Empty;
        row[COL_TOTAL] = s("n/a");
        row[COL_PAID] = Data::Empty;
        row[COL_OUTSTANDING] = Data::Bool(true);
        row.truncate(COL_SALES_PERSON);

        let candidate = decode_row(2, &row).into_accepted().unwrap();
        assert_eq!(candidate.customer_name, "");
        assert_eq!(candidate.total_amount, Decimal::ZERO);
        assert_eq!(candidate.paid_amount, Decimal::ZERO);
        assert_eq!(candidate.outstanding_amount, Decimal::ZERO);
        assert_eq!(candidate.sales_person, "");
    }

    #[test]
    fn test_header_row_is_rejected() {
        let header: Vec<Data> = [
            "Customer", "Name", "Invoice Date", "", "Invoice No", "Due Date", "Total", "Paid",
            "Outstanding", "Sales",
        ]
        .iter()
        .map(|v| s(v))
        .collect();
        assert_eq!(
            rejected(decode_row(1, &header)),
            RejectReason::InvalidInvoiceDate
        );
    }

    #[test]
    fn test_strings_are_trimmed() {
        let mut row = valid_row();
        row[COL_CUSTOMER_ID] = s("  N001  ");
        row[COL_INVOICE_NUMBER] = s(" INV-9 ");
        let candidate = decode_row(2, &row).into_accepted().unwrap();
        assert_eq!(candidate.customer_external_id, "N001");
        assert_eq!(candidate.invoice_number, "INV-9");
    }

    #[test]
    fn test_serial_to_date() {
        assert_eq!(serial_to_date(1.0), Some(date(1899, 12, 31)));
        assert_eq!(serial_to_date(45306.0), Some(date(2024, 1, 15)));
        // Fraction is a time of day
        assert_eq!(serial_to_date(45306.75), Some(date(2024, 1, 15)));
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(serial_to_date(-5.0), None);
        assert_eq!(serial_to_date(f64::NAN), None);
        assert_eq!(serial_to_date(1e12), None);
    }

    #[test]
    fn test_parse_date_str_formats() {
        let expected = date(2024, 1, 15);
        assert_eq!(parse_date_str("2024-01-15"), Some(expected));
        assert_eq!(parse_date_str("01/15/2024"), Some(expected));
        assert_eq!(parse_date_str("01/15/24"), Some(expected));
        assert_eq!(parse_date_str("15/01/2024"), Some(expected));
        assert_eq!(parse_date_str("2024/01/15"), Some(expected));
        assert_eq!(parse_date_str("01-15-2024"), Some(expected));
        assert_eq!(parse_date_str("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_date_str("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_date_str("2024-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_date_str("  2024-01-15  "), Some(expected));
    }

    #[test]
    fn test_parse_date_str_rejects_garbage() {
        assert_eq!(parse_date_str(""), None);
        assert_eq!(parse_date_str("Invoice Date"), None);
        assert_eq!(parse_date_str("2024-13-45"), None);
        assert_eq!(parse_date_str("yesterday"), None);
    }

    #[test]
    fn test_ambiguous_slash_date_is_month_first() {
        assert_eq!(parse_date_str("02/03/2024"), Some(date(2024, 2, 3)));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), dec("1234.56"));
        assert_eq!(parse_amount("  1 234 567 "), dec("1234567"));
        assert_eq!(parse_amount("-50.5"), dec("-50.5"));
        assert_eq!(parse_amount("1.5e3"), dec("1500"));
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
    }

    #[test]
    fn test_float_cells_keep_short_decimal_form() {
        assert_eq!(cell_decimal(&Data::Float(1234.56)), dec("1234.56"));
        assert_eq!(cell_decimal(&Data::Float(0.1)), dec("0.1"));
        assert_eq!(cell_decimal(&Data::Int(42)), dec("42"));
        assert_eq!(cell_decimal(&Data::Float(f64::INFINITY)), Decimal::ZERO);
    }

    #[test]
    fn test_decode_workbook_round_trip() {
        let bytes = WorkbookBuilder::new()
            .header()
            .invoice(
                InvoiceRow::new("R1234", "INV-001", serial(date(2024, 1, 15)), "2024-02-14")
                    .name("Southern Supply")
                    .amounts(1500.0, 500.0, 1000.0)
                    .sales_person("Somchai"),
            )
            .invoice(
                InvoiceRow::new("A0001", "INV-002", "01/20/2024", serial(date(2024, 2, 19)))
                    .name("Bangkok Trading")
                    .outstanding(200.0),
            )
            .invoice(
                InvoiceRow::new("8JB001", "SUM", 45306.0, 45306.0)
                    .name("Subtotal")
                    .outstanding(1200.0),
            )
            .build();

        let outcomes = decode_workbook(&bytes).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(
            outcomes[0],
            RowOutcome::Rejected {
                row: 1,
                reason: RejectReason::InvalidInvoiceDate
            }
        ));
        assert!(matches!(
            outcomes[3],
            RowOutcome::Rejected {
                row: 4,
                reason: RejectReason::ExcludedCustomerId(_)
            }
        ));

        let candidates = parse_workbook(&bytes).unwrap();
        assert_eq!(candidates.len(), 2);

        let first = &candidates[0];
        assert_eq!(first.customer_external_id, "R1234");
        assert_eq!(first.customer_name, "Southern Supply");
        assert_eq!(first.invoice_date, date(2024, 1, 15));
        assert_eq!(first.due_date, date(2024, 2, 14));
        assert_eq!(first.total_amount, dec("1500"));
        assert_eq!(first.paid_amount, dec("500"));
        assert_eq!(first.outstanding_amount, dec("1000"));
        assert_eq!(first.sales_person, "Somchai");

        let second = &candidates[1];
        assert_eq!(second.customer_external_id, "A0001");
        assert_eq!(second.invoice_date, date(2024, 1, 20));
        assert_eq!(second.due_date, date(2024, 2, 19));
        assert_eq!(second.outstanding_amount, dec("200"));
        assert_eq!(second.sales_person, "");
    }

    #[test]
    fn test_leading_empty_columns_keep_absolute_positions() {
        // Column A is empty, so the row has no customer ID even though C..F are filled
        let bytes = WorkbookBuilder::new()
            .cell(2, 1, "Orphan Co")
            .cell(3, 1, "2024-01-15")
            .cell(5, 1, "INV-1")
            .cell(6, 1, "2024-02-15")
            .build();

        let outcomes = decode_workbook(&bytes).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0],
            RowOutcome::Rejected {
                reason: RejectReason::MissingCustomerId,
                ..
            }
        ));
    }

    #[test]
    fn test_unreadable_buffer_is_an_error() {
        let err = decode_workbook(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, Error::Spreadsheet(_)));
    }

    #[test]
    fn test_empty_sheet_yields_no_rows() {
        let bytes = WorkbookBuilder::new().build();
        assert!(decode_workbook(&bytes).unwrap().is_empty());
        assert!(parse_workbook(&bytes).unwrap().is_empty());
    }
}
