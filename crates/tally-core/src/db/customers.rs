//! Customer operations

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, OptionalExtension};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Customer, NewCustomer};

/// Stay well under SQLite's bound-parameter limit for IN (...) lookups
const LOOKUP_CHUNK: usize = 500;

const CUSTOMER_COLUMNS: &str = "id, external_id, name, region_code, sales_person, created_at";

fn row_to_customer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    let created_at_str: String = row.get(5)?;
    Ok(Customer {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        region_code: row.get(3)?,
        sales_person: row.get(4)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Customers whose external ID is in `external_ids`, keyed by external ID
    pub fn find_customers_by_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<HashMap<String, Customer>> {
        let conn = self.conn()?;
        let mut found = HashMap::with_capacity(external_ids.len());

        for chunk in external_ids.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM customers WHERE external_id IN ({})",
                CUSTOMER_COLUMNS, placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let customers = stmt
                .query_map(params_from_iter(chunk.iter()), row_to_customer)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for customer in customers {
                found.insert(customer.external_id.clone(), customer);
            }
        }

        Ok(found)
    }

    /// Create customers in one transaction, skipping external IDs that already exist
    ///
    /// Returns the number of customers actually created.
    pub fn create_customers(&self, customers: &[NewCustomer]) -> Result<usize> {
        if customers.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut created = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO customers (external_id, name, region_code, sales_person)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(external_id) DO NOTHING
                "#,
            )?;
            for customer in customers {
                created += stmt.execute(params![
                    customer.external_id,
                    customer.name,
                    customer.region_code,
                    customer.sales_person,
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            requested = customers.len(),
            created, "Created customers"
        );
        Ok(created)
    }

    /// Get a customer by external ID
    pub fn get_customer_by_external_id(&self, external_id: &str) -> Result<Option<Customer>> {
        let conn = self.conn()?;
        let customer = conn
            .query_row(
                &format!(
                    "SELECT {} FROM customers WHERE external_id = ?",
                    CUSTOMER_COLUMNS
                ),
                params![external_id],
                row_to_customer,
            )
            .optional()?;
        Ok(customer)
    }

    /// List all customers ordered by region code, then external ID
    pub fn list_customers(&self) -> Result<Vec<Customer>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM customers ORDER BY region_code, external_id",
            CUSTOMER_COLUMNS
        ))?;

        let customers = stmt
            .query_map([], row_to_customer)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(customers)
    }

    /// Distinct region codes across all customers
    pub fn customer_region_codes(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT region_code FROM customers ORDER BY region_code")?;
        let codes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(codes)
    }
}
