//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Accounts-receivable aging from invoice spreadsheets
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Import invoice workbooks and produce AR aging reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Region table override (TOML)
    ///
    /// Defaults to ~/.local/share/tally/config/regions.toml when present,
    /// otherwise the built-in table.
    #[arg(long, global = true)]
    pub regions: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import invoices from an Excel workbook (.xlsx or .xls)
    Import {
        /// Workbook to import
        #[arg(short, long)]
        file: PathBuf,

        /// Recorded on the import batch
        #[arg(short, long, default_value = "cli")]
        uploaded_by: String,

        /// Reference date for days overdue (YYYY-MM-DD, default: now)
        #[arg(long)]
        as_of: Option<String>,

        /// Print the import result as JSON
        #[arg(long)]
        json: bool,
    },

    /// AR aging report grouped by region
    Report {
        /// Report type: all, 45days, 90days, over90days
        #[arg(short = 't', long = "type", default_value = "all")]
        report_type: String,

        /// Report date (YYYY-MM-DD, default: now)
        #[arg(long)]
        as_of: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List invoices with filters and paging
    Invoices {
        /// Match invoice number, customer ID or customer name
        #[arg(short, long)]
        search: Option<String>,

        /// Region label (see `tally regions`)
        #[arg(short, long)]
        region: Option<String>,

        /// Sales person (exact match)
        #[arg(long)]
        sales_person: Option<String>,

        /// Sort: due-date, outstanding, days-overdue
        #[arg(long, default_value = "due-date")]
        sort: String,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: i64,

        /// Invoices per page
        #[arg(long, default_value = "20")]
        per_page: i64,

        /// Reference date for days overdue (YYYY-MM-DD, default: today)
        #[arg(long)]
        as_of: Option<String>,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// List customers with their regions
    Customers,

    /// Show recent import batches
    Imports {
        /// Number of batches to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Show database status (encryption, size, record counts)
    Status,

    /// Delete all invoices, import batches and customers
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the active region table
    Regions,
}
