//! Invoice filter builder for constructing dynamic SQL queries
//!
//! Listing rows and listing stats share one WHERE clause, so the builder
//! produces it once and both queries reuse it.

use crate::models::InvoiceSort;

/// Region restriction, already translated from a label into codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionCodes<'query> {
    /// Customers whose region code is one of these
    In(Vec<&'query str>),
    /// Customers whose region code is none of these (the default label)
    NotIn(Vec<&'query str>),
}

/// Builder for invoice listing filters
///
/// Queries using the result must alias invoices as `i` and customers as `c`.
#[derive(Default)]
pub struct InvoiceFilter<'query> {
    pub search: Option<&'query str>,
    pub region: Option<RegionCodes<'query>>,
    pub sales_person: Option<&'query str>,
    pub sort: InvoiceSort,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// ORDER BY clause including "ORDER BY" keyword
    pub order_clause: &'static str,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> InvoiceFilter<'query> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive match on invoice number, customer ID or customer name
    pub fn search(mut self, query: Option<&'query str>) -> Self {
        self.search = query;
        self
    }

    pub fn region(mut self, region: Option<RegionCodes<'query>>) -> Self {
        self.region = region;
        self
    }

    pub fn sales_person(mut self, name: Option<&'query str>) -> Self {
        self.sales_person = name;
        self
    }

    pub fn sort(mut self, sort: InvoiceSort) -> Self {
        self.sort = sort;
        self
    }

    /// Build the filter components
    pub fn build(self) -> FilterResult {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = self.search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(i.invoice_number LIKE ? COLLATE NOCASE \
                     OR c.external_id LIKE ? COLLATE NOCASE \
                     OR c.name LIKE ? COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = format!("%{}%", q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        match self.region {
            Some(RegionCodes::In(codes)) => {
                if codes.is_empty() {
                    // Unknown label: nothing can match
                    conditions.push("0".to_string());
                } else {
                    conditions.push(format!("c.region_code IN ({})", placeholders(codes.len())));
                    for code in codes {
                        params.push(Box::new(code.to_string()));
                    }
                }
            }
            Some(RegionCodes::NotIn(codes)) => {
                if !codes.is_empty() {
                    conditions.push(format!(
                        "c.region_code NOT IN ({})",
                        placeholders(codes.len())
                    ));
                    for code in codes {
                        params.push(Box::new(code.to_string()));
                    }
                }
            }
            None => {}
        }

        if let Some(sp) = self.sales_person {
            if !sp.trim().is_empty() {
                conditions.push("i.sales_person = ?".to_string());
                params.push(Box::new(sp.trim().to_string()));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Most days overdue is the earliest due date
        let order_clause = match self.sort {
            InvoiceSort::DueDate | InvoiceSort::DaysOverdue => "ORDER BY i.due_date ASC, i.id ASC",
            InvoiceSort::Outstanding => {
                "ORDER BY CAST(i.outstanding_amount AS REAL) DESC, i.due_date ASC, i.id ASC"
            }
        };

        FilterResult {
            where_clause,
            order_clause,
            params,
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter() {
        let result = InvoiceFilter::new().build();
        assert!(result.where_clause.is_empty());
        assert!(result.params.is_empty());
        assert_eq!(result.order_clause, "ORDER BY i.due_date ASC, i.id ASC");
    }

    #[test]
    fn test_search_binds_three_patterns() {
        let result = InvoiceFilter::new().search(Some("  acme ")).build();
        assert!(result.where_clause.contains("i.invoice_number LIKE ?"));
        assert!(result.where_clause.contains("c.name LIKE ?"));
        assert_eq!(result.params.len(), 3);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let result = InvoiceFilter::new().search(Some("   ")).build();
        assert!(result.where_clause.is_empty());
    }

    #[test]
    fn test_region_in_and_not_in() {
        let result = InvoiceFilter::new()
            .region(Some(RegionCodes::In(vec!["A", "B"])))
            .build();
        assert_eq!(result.where_clause, "WHERE c.region_code IN (?, ?)");
        assert_eq!(result.params.len(), 2);

        let result = InvoiceFilter::new()
            .region(Some(RegionCodes::NotIn(vec!["R"])))
            .build();
        assert_eq!(result.where_clause, "WHERE c.region_code NOT IN (?)");
    }

    #[test]
    fn test_unknown_region_matches_nothing() {
        let result = InvoiceFilter::new()
            .region(Some(RegionCodes::In(Vec::new())))
            .build();
        assert_eq!(result.where_clause, "WHERE 0");
    }

    #[test]
    fn test_conditions_are_joined() {
        let result = InvoiceFilter::new()
            .search(Some("inv"))
            .sales_person(Some("Somchai"))
            .sort(InvoiceSort::Outstanding)
            .build();
        assert!(result.where_clause.contains(" AND i.sales_person = ?"));
        assert_eq!(result.params.len(), 4);
        assert!(result.order_clause.starts_with("ORDER BY CAST(i.outstanding_amount"));
    }
}
