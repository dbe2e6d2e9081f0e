//! Customer resolver: external customer IDs to internal customer records
//!
//! Customers are created lazily the first time an upload mentions them and
//! are never modified by later uploads. Creation tolerates a concurrent
//! import creating the same customer first: the final mapping is always
//! re-read from the store.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::error::Result;
use crate::models::{InvoiceCandidate, NewCustomer};
use crate::regions::RegionMap;
use crate::store::InvoiceStore;

/// Sales person recorded for customers whose first row names nobody
pub const UNKNOWN_SALES_PERSON: &str = "N/A";

/// External ID -> internal customer ID for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerMapping {
    ids: HashMap<String, i64>,
    /// Customers this batch created
    pub created: usize,
    /// Customers that already existed before this batch
    pub existing: usize,
}

impl CustomerMapping {
    pub fn get(&self, external_id: &str) -> Option<i64> {
        self.ids.get(external_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct CustomerResolver<'a, S: InvoiceStore + ?Sized> {
    store: &'a S,
    regions: &'a RegionMap,
}

impl<'a, S: InvoiceStore + ?Sized> CustomerResolver<'a, S> {
    pub fn new(store: &'a S, regions: &'a RegionMap) -> Self {
        Self { store, regions }
    }

    /// Map every distinct customer in `candidates`, creating the missing ones
    ///
    /// The first row mentioning a customer supplies its name and sales person.
    pub fn resolve(&self, candidates: &[InvoiceCandidate]) -> Result<CustomerMapping> {
        let mut seen = HashSet::new();
        let distinct: Vec<&InvoiceCandidate> = candidates
            .iter()
            .filter(|c| seen.insert(c.customer_external_id.as_str()))
            .collect();
        let external_ids: Vec<String> = distinct
            .iter()
            .map(|c| c.customer_external_id.clone())
            .collect();

        let existing = self.store.find_customers_by_external_ids(&external_ids)?;

        let new_customers: Vec<NewCustomer> = distinct
            .iter()
            .filter(|c| !existing.contains_key(&c.customer_external_id))
            .map(|c| self.new_customer(c))
            .collect();

        let created = if new_customers.is_empty() {
            0
        } else {
            self.store.create_customers(&new_customers)?
        };

        // Re-read: rows another import created in between are picked up here
        let ids: HashMap<String, i64> = if new_customers.is_empty() {
            existing
                .into_iter()
                .map(|(external_id, customer)| (external_id, customer.id))
                .collect()
        } else {
            self.store
                .find_customers_by_external_ids(&external_ids)?
                .into_iter()
                .map(|(external_id, customer)| (external_id, customer.id))
                .collect()
        };

        if created < new_customers.len() {
            debug!(
                requested = new_customers.len(),
                created, "Some customers were created concurrently"
            );
        }
        info!(
            customers = external_ids.len(),
            created,
            existing = external_ids.len() - new_customers.len(),
            "Resolved customers"
        );

        Ok(CustomerMapping {
            ids,
            created,
            existing: external_ids.len() - new_customers.len(),
        })
    }

    fn new_customer(&self, candidate: &InvoiceCandidate) -> NewCustomer {
        let sales_person = candidate.sales_person.trim();
        NewCustomer {
            external_id: candidate.customer_external_id.clone(),
            name: candidate.customer_name.clone(),
            region_code: self.regions.region_code(&candidate.customer_external_id),
            sales_person: if sales_person.is_empty() {
                UNKNOWN_SALES_PERSON.to_string()
            } else {
                sales_person.to_string()
            },
        }
    }
}
