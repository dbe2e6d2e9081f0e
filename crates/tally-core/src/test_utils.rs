//! Test utilities for tally-core
//!
//! Builds invoice workbooks in memory so decoder and ingestion tests can run
//! against real xlsx bytes instead of hand-built cell grids.

use chrono::NaiveDate;

use crate::import::{
    COL_CUSTOMER_ID, COL_CUSTOMER_NAME, COL_DUE_DATE, COL_INVOICE_DATE, COL_INVOICE_NUMBER,
    COL_OUTSTANDING, COL_PAID, COL_SALES_PERSON, COL_TOTAL,
};

const SHEET: &str = "Sheet1";

/// A value to place in a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Spreadsheet serial number for a date (1900 date system)
pub fn serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    (date - epoch).num_days() as f64
}

/// One invoice line in the fixed column layout
#[derive(Debug, Clone)]
pub struct InvoiceRow {
    cells: Vec<(usize, CellValue)>,
}

impl InvoiceRow {
    /// Row with the required fields; dates may be serials or strings
    pub fn new(
        customer_id: &str,
        invoice_number: &str,
        invoice_date: impl Into<CellValue>,
        due_date: impl Into<CellValue>,
    ) -> Self {
        Self {
            cells: vec![
                (COL_CUSTOMER_ID, customer_id.into()),
                (COL_INVOICE_NUMBER, invoice_number.into()),
                (COL_INVOICE_DATE, invoice_date.into()),
                (COL_DUE_DATE, due_date.into()),
            ],
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.cells.push((COL_CUSTOMER_NAME, name.into()));
        self
    }

    pub fn amounts(mut self, total: f64, paid: f64, outstanding: f64) -> Self {
        self.cells.push((COL_TOTAL, total.into()));
        self.cells.push((COL_PAID, paid.into()));
        self.cells.push((COL_OUTSTANDING, outstanding.into()));
        self
    }

    /// Outstanding only (total = outstanding, nothing paid)
    pub fn outstanding(self, amount: f64) -> Self {
        self.amounts(amount, 0.0, amount)
    }

    pub fn sales_person(mut self, name: &str) -> Self {
        self.cells.push((COL_SALES_PERSON, name.into()));
        self
    }
}

/// Builder for single-sheet invoice workbooks
pub struct WorkbookBuilder {
    book: umya_spreadsheet::Spreadsheet,
    next_row: u32,
}

impl Default for WorkbookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self {
            book: umya_spreadsheet::new_file(),
            next_row: 1,
        }
    }

    /// Append the usual header row
    pub fn header(self) -> Self {
        let labels = [
            "Customer ID",
            "Customer Name",
            "Invoice Date",
            "Ref",
            "Invoice No",
            "Due Date",
            "Total",
            "Paid",
            "Outstanding",
            "Sales Person",
        ];
        let row = self.next_row;
        let mut builder = self;
        for (col, label) in labels.iter().enumerate() {
            builder = builder.cell(col as u32 + 1, row, *label);
        }
        builder.next_row = row + 1;
        builder
    }

    /// Append an invoice row
    pub fn invoice(mut self, invoice: InvoiceRow) -> Self {
        let row = self.next_row;
        for (col, value) in invoice.cells {
            self = self.cell(col as u32 + 1, row, value);
        }
        self.next_row = row + 1;
        self
    }

    /// Set a single cell (1-based column and row)
    pub fn cell(mut self, col: u32, row: u32, value: impl Into<CellValue>) -> Self {
        let sheet = self
            .book
            .get_sheet_by_name_mut(SHEET)
            .expect("new workbook has Sheet1");
        match value.into() {
            CellValue::Text(s) => {
                sheet.get_cell_mut((col, row)).set_value_string(s);
            }
            CellValue::Number(n) => {
                sheet.get_cell_mut((col, row)).set_value_number(n);
            }
            CellValue::Empty => {}
        }
        if row >= self.next_row {
            self.next_row = row + 1;
        }
        self
    }

    /// Serialize to xlsx bytes
    pub fn build(self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut out)
            .expect("write workbook");
        out
    }
}
