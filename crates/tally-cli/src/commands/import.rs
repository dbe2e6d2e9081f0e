//! Workbook import command

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tally_core::{
    db::Database, ingest_workbook, ImportRequest, IngestResult, RegionMap, UploadLimits,
};

pub fn cmd_import(
    db: &Database,
    regions: &RegionMap,
    file: &Path,
    uploaded_by: &str,
    limits: UploadLimits,
    now: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let data =
        std::fs::read(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    let mut request = ImportRequest::new(&data, uploaded_by).limits(limits);
    if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
        request = request.file_name(name);
    }

    if !json {
        println!("📥 Importing invoices from {}...", file.display());
    }

    let result = ingest_workbook(db, regions, request, now)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

fn print_result(result: &IngestResult) {
    println!("✅ Import complete! (batch #{})", result.batch_id);
    println!("   Imported: {}", result.inserted);
    println!("   Skipped (duplicates): {}", result.skipped);

    if !result.errors.is_empty() {
        println!("   ⚠️  Errors: {}", result.errors.len());
        for error in result.errors.iter().take(10) {
            println!(
                "      [{}] {}: {}",
                error.index, error.invoice_number, error.error
            );
        }
        if result.errors.len() > 10 {
            println!("      ... and {} more", result.errors.len() - 10);
        }
    }
}
