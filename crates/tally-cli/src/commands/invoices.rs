//! Invoice listing command

use anyhow::Result;
use tally_core::{db::Database, models::InvoiceQuery, AgingBucket, RegionMap};

use super::{format_amount, truncate};

pub fn cmd_invoices(
    db: &Database,
    regions: &RegionMap,
    query: &InvoiceQuery,
    json: bool,
) -> Result<()> {
    let page = db.list_invoices(query, regions)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.invoices.is_empty() {
        println!("No invoices found. Import some with:");
        println!("  tally import --file invoices.xlsx");
        return Ok(());
    }

    println!();
    println!(
        "📝 Invoices (page {} of {}, {} total)",
        page.meta.page, page.meta.total_pages, page.meta.total
    );
    println!("   ─────────────────────────────────────────────────────────────");

    for invoice in &page.invoices {
        let days = if invoice.aging_bucket == AgingBucket::Current {
            format!("{:>5}d", invoice.days_overdue)
        } else {
            format!("\x1b[31m{:>5}d\x1b[0m", invoice.days_overdue) // Red when overdue
        };
        println!(
            "   {} │ {:12} │ {:>14} │ {} │ {} {}",
            invoice.due_date,
            truncate(&invoice.invoice_number, 12),
            format_amount(invoice.outstanding_amount),
            days,
            invoice.customer.external_id,
            truncate(&invoice.customer_name, 30)
        );
    }

    println!();
    println!(
        "   Outstanding: {} │ Overdue: {} of {}",
        format_amount(page.stats.total_outstanding),
        page.stats.overdue_invoices,
        page.stats.total_invoices
    );
    if page.meta.page < page.meta.total_pages {
        println!("   Use --page {} for more.", page.meta.page + 1);
    }

    Ok(())
}
