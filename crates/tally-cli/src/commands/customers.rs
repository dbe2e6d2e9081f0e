//! Customer listing command

use anyhow::Result;
use tally_core::{db::Database, RegionMap};

use super::truncate;

pub fn cmd_customers(db: &Database, regions: &RegionMap) -> Result<()> {
    let customers = db.list_customers()?;

    if customers.is_empty() {
        println!("No customers yet. They are created when invoices are imported:");
        println!("  tally import --file invoices.xlsx");
        return Ok(());
    }

    println!();
    println!("👥 Customers ({})", customers.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for customer in customers {
        println!(
            "   {:10} │ {:30} │ {:20} │ {}",
            customer.external_id,
            truncate(&customer.name, 30),
            regions.label(&customer.region_code),
            customer.sales_person
        );
    }

    Ok(())
}
