//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, load_regions, resolve_now)
//! - `customers` - Customer listing
//! - `import` - Workbook import
//! - `invoices` - Invoice listing with filters and paging
//! - `reports` - AR aging report
//! - `status` - Status/imports/clear/regions commands

pub mod core;
pub mod customers;
pub mod import;
pub mod invoices;
pub mod reports;
pub mod status;

// Re-export command functions for main.rs
pub use core::*;
pub use customers::*;
pub use import::*;
pub use invoices::*;
pub use reports::*;
pub use status::*;

use rust_decimal::{Decimal, RoundingStrategy};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Two decimal places with thousands separators
pub fn format_amount(amount: Decimal) -> String {
    let rounded = format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    );
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", sign, grouped, fraction)
}
