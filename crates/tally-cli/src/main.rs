//! Tally CLI - Accounts-receivable aging
//!
//! Usage:
//!   tally init                      Initialize database
//!   tally import --file june.xlsx   Import an invoice workbook
//!   tally report --type 90days      AR aging report by region
//!   tally invoices --region ใต้     Browse invoices

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import {
            file,
            uploaded_by,
            as_of,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let regions = commands::load_regions(cli.regions.as_deref())?;
            let now = commands::resolve_now(as_of.as_deref())?;
            let limits = tally_core::UploadLimits::from_env()?;
            commands::cmd_import(&db, &regions, &file, &uploaded_by, limits, now, json)
        }
        Commands::Report {
            report_type,
            as_of,
            json,
        } => {
            let report_type = commands::parse_report_type(&report_type)?;
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let regions = commands::load_regions(cli.regions.as_deref())?;
            let now = commands::resolve_now(as_of.as_deref())?;
            commands::cmd_report(&db, &regions, report_type, now, json)
        }
        Commands::Invoices {
            search,
            region,
            sales_person,
            sort,
            page,
            per_page,
            as_of,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let regions = commands::load_regions(cli.regions.as_deref())?;
            let now = commands::resolve_now(as_of.as_deref())?;
            let mut query = tally_core::InvoiceQuery::new(now.date());
            query.search = search;
            query.region = region;
            query.sales_person = sales_person;
            query.sort = sort
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            query.page = page;
            query.per_page = per_page;
            commands::cmd_invoices(&db, &regions, &query, json)
        }
        Commands::Customers => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let regions = commands::load_regions(cli.regions.as_deref())?;
            commands::cmd_customers(&db, &regions)
        }
        Commands::Imports { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_imports(&db, limit)
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Clear { yes } => {
            if !cli.db.exists() {
                anyhow::bail!("Database not found: {}", cli.db.display());
            }
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_clear(&db, yes)
        }
        Commands::Regions => {
            let regions = commands::load_regions(cli.regions.as_deref())?;
            commands::cmd_regions(&regions)
        }
    }
}
