//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_regions` - Region table from --regions, the data dir, or built-in
//! - `resolve_now` - Reference time from --as-of
//! - `parse_report_type` - Validate --type before anything touches the store
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use tally_core::{db::Database, models::ReportType, RegionMap};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn load_regions(path: Option<&Path>) -> Result<RegionMap> {
    RegionMap::load(path).context("Failed to load region table")
}

/// `--as-of` date at midnight, or the current local time
pub fn resolve_now(as_of: Option<&str>) -> Result<NaiveDateTime> {
    match as_of {
        Some(s) => {
            let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .context("Invalid --as-of date format (use YYYY-MM-DD)")?;
            Ok(date.and_time(chrono::NaiveTime::MIN))
        }
        None => Ok(Local::now().naive_local()),
    }
}

pub fn parse_report_type(s: &str) -> Result<ReportType> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let counts = db.data_counts().context("Failed to read database")?;
    println!(
        "   Invoices: {}, customers: {}, uploads: {}",
        counts.invoices, counts.customers, counts.uploads
    );

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import invoices: tally import --file invoices.xlsx");
    println!("  2. Aging report: tally report --type all");

    Ok(())
}
