//! AR aging report command

use anyhow::Result;
use chrono::NaiveDateTime;
use tally_core::{
    db::Database, generate_report, models::ReportType, ArReport, RegionMap, ReportSummary,
};

use super::{format_amount, truncate};

pub fn cmd_report(
    db: &Database,
    regions: &RegionMap,
    report_type: ReportType,
    now: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let report = generate_report(db, regions, report_type, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ArReport) {
    println!();
    println!("📊 AR Aging Report ({})", report.report_type);
    println!("   As of: {}", report.report_date.format("%Y-%m-%d %H:%M"));
    println!("   ─────────────────────────────────────────────────────────────");

    if report.regions.is_empty() {
        println!("   No invoices match this report.");
        return;
    }

    for group in &report.regions {
        println!();
        println!(
            "   {} │ {} invoices │ {} │ avg {} days",
            group.region,
            group.summary.total_invoices,
            format_amount(group.summary.total_outstanding),
            group.summary.avg_days_overdue
        );
        print_buckets(&group.summary);

        for invoice in &group.invoices {
            println!(
                "      {} │ {} │ {:>14} │ {:>5}d │ {}",
                invoice.due_date,
                truncate(&invoice.invoice_number, 12),
                format_amount(invoice.outstanding_amount),
                invoice.days_overdue,
                truncate(&invoice.customer_name, 30)
            );
        }
    }

    println!();
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Total: {} invoices │ {} │ avg {} days",
        report.total_invoices,
        format_amount(report.total_outstanding),
        report.overall_summary.avg_days_overdue
    );
    print_buckets(&report.overall_summary);
}

fn print_buckets(summary: &ReportSummary) {
    for bucket in &summary.aging_buckets {
        println!(
            "      {:20} │ {:>5} │ {:>14} │ {:>3}%",
            bucket.bucket.label(),
            bucket.count,
            format_amount(bucket.total_outstanding),
            bucket.percentage
        );
    }
}
