//! Status-related command implementations (status, imports, clear, regions)

use std::path::Path;

use anyhow::Result;
use tally_core::db::{Database, DB_KEY_ENV};
use tally_core::{ImportStatus, RegionMap};

use super::open_db;

/// Where the database lives, how it is keyed and what it holds
pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let key_set = std::env::var(DB_KEY_ENV).is_ok();
    let encryption = match (no_encrypt, key_set) {
        (true, _) => "off (--no-encrypt)".to_string(),
        (false, true) => format!("on, key from {}", DB_KEY_ENV),
        (false, false) => format!("required, but {} is not set", DB_KEY_ENV),
    };

    println!();
    println!("📊 Tally Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Database:   {}", db_path.display());
    println!("   Encryption: {}", encryption);

    let Ok(metadata) = std::fs::metadata(db_path) else {
        println!("   Not initialized yet. Create it with: tally init");
        println!();
        return Ok(());
    };
    println!("   File size:  {}", format_size(metadata.len()));

    match open_db(db_path, no_encrypt) {
        Ok(db) => {
            let counts = db.data_counts()?;
            println!();
            println!(
                "   {} invoices, {} customers, {} uploads",
                counts.invoices, counts.customers, counts.uploads
            );
            if let Some(last) = db.list_import_batches(1)?.first() {
                println!(
                    "   Last import: #{} {} ({}) at {}",
                    last.id,
                    last.file_name,
                    last.processing_status,
                    last.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Err(e) => {
            println!();
            println!("   ❌ Cannot open database: {:#}", e);
        }
    }

    println!();
    Ok(())
}

fn format_size(bytes: u64) -> String {
    let kib = bytes as f64 / 1024.0;
    if kib < 1024.0 {
        format!("{:.1} KB", kib)
    } else {
        format!("{:.1} MB", kib / 1024.0)
    }
}

pub fn cmd_imports(db: &Database, limit: i64) -> Result<()> {
    let batches = db.list_import_batches(limit)?;

    if batches.is_empty() {
        println!("No imports yet. Import a workbook with:");
        println!("  tally import --file invoices.xlsx");
        return Ok(());
    }

    println!();
    println!("📦 Recent Imports");
    println!("   ─────────────────────────────────────────────────────────────");

    for batch in batches {
        let icon = match batch.processing_status {
            ImportStatus::Completed => "✅",
            ImportStatus::Pending => "⏳",
            ImportStatus::Failed => "❌",
        };
        println!(
            "   {} #{} │ {} │ {} │ {} invoices, {} errors │ {}",
            icon,
            batch.id,
            batch.created_at.format("%Y-%m-%d %H:%M"),
            batch.file_name,
            batch.invoice_count,
            batch.error_count,
            batch.uploaded_by
        );
    }

    Ok(())
}

/// Delete all invoices, import batches and customers
pub fn cmd_clear(db: &Database, yes: bool) -> Result<()> {
    use std::io::{self, Write};

    let counts = db.data_counts()?;

    if !yes {
        print!(
            "⚠️  This will delete {} invoices, {} uploads and {} customers.\n\n",
            counts.invoices, counts.uploads, counts.customers
        );
        print!("Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = db.clear_all()?;

    println!("✅ All data cleared.");
    println!("   Invoices: {}", deleted.invoices);
    println!("   Uploads: {}", deleted.uploads);
    println!("   Customers: {}", deleted.customers);

    Ok(())
}

pub fn cmd_regions(regions: &RegionMap) -> Result<()> {
    println!();
    println!("🗺️  Regions");
    println!("   ─────────────────────────────────────────────────────────────");

    for (label, codes) in regions.entries() {
        println!("   {:24} │ {}", label, codes.join(", "));
    }
    println!("   {:24} │ (any other code)", regions.default_label());

    Ok(())
}
