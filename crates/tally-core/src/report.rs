//! AR aging report aggregation
//!
//! Groups invoice records by region label and summarizes each group and the
//! whole report: totals, bucket distribution and average days overdue.
//! Building a report is pure; [`generate_report`] only adds the store read.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{AgingBucket, InvoiceRecord, ReportType};
use crate::regions::{LabelCollator, RegionMap};
use crate::store::InvoiceStore;

/// Count and outstanding total for one bucket within a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingBucketSummary {
    pub bucket: AgingBucket,
    pub count: usize,
    pub total_outstanding: Decimal,
    /// Share of the scope's outstanding total, rounded half away from zero
    pub percentage: i64,
}

/// Summary of one scope (a region group or the whole report)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_invoices: usize,
    pub total_outstanding: Decimal,
    pub avg_days_overdue: i64,
    /// Non-empty buckets in order current, 1-45, 46-90, over90
    pub aging_buckets: Vec<AgingBucketSummary>,
}

/// Invoices sharing one region label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionGroup {
    pub region: String,
    pub invoices: Vec<InvoiceRecord>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArReport {
    pub report_date: NaiveDateTime,
    pub report_type: ReportType,
    pub total_invoices: usize,
    pub total_outstanding: Decimal,
    pub regions: Vec<RegionGroup>,
    pub overall_summary: ReportSummary,
}

/// Read the invoices for `report_type` and aggregate them
pub fn generate_report<S: InvoiceStore + ?Sized>(
    store: &S,
    regions: &RegionMap,
    report_type: ReportType,
    now: NaiveDateTime,
) -> Result<ArReport> {
    let records = store.query_invoices(report_type.bucket_filter())?;
    debug!(
        report_type = %report_type,
        invoices = records.len(),
        "Generating AR report"
    );
    Ok(build_report(records, report_type, regions, now))
}

/// Aggregate already-filtered records into a report
///
/// Records keep their input order within a group; groups are ordered by
/// label with the locale-aware collator.
pub fn build_report(
    records: Vec<InvoiceRecord>,
    report_type: ReportType,
    regions: &RegionMap,
    now: NaiveDateTime,
) -> ArReport {
    let mut groups: Vec<(String, Vec<InvoiceRecord>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let label = regions.label(&record.customer.region_code).to_string();
        match index.get(&label) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push((label, vec![record]));
            }
        }
    }

    let mut collator = LabelCollator::new();
    groups.sort_by(|a, b| collator.compare(&a.0, &b.0));

    let regions: Vec<RegionGroup> = groups
        .into_iter()
        .map(|(region, invoices)| {
            let summary = summarize(&invoices, mean_days_overdue(&invoices));
            RegionGroup {
                region,
                invoices,
                summary,
            }
        })
        .collect();

    let all: Vec<&InvoiceRecord> = regions.iter().flat_map(|g| g.invoices.iter()).collect();
    let overall_summary = summarize_refs(&all, weighted_average(&regions));

    ArReport {
        report_date: now,
        report_type,
        total_invoices: overall_summary.total_invoices,
        total_outstanding: overall_summary.total_outstanding,
        regions,
        overall_summary,
    }
}

fn summarize(invoices: &[InvoiceRecord], avg_days_overdue: i64) -> ReportSummary {
    let refs: Vec<&InvoiceRecord> = invoices.iter().collect();
    summarize_refs(&refs, avg_days_overdue)
}

fn summarize_refs(invoices: &[&InvoiceRecord], avg_days_overdue: i64) -> ReportSummary {
    let total_outstanding = sum_amounts(invoices.iter().map(|i| i.outstanding_amount));

    let aging_buckets = AgingBucket::all()
        .iter()
        .filter_map(|&bucket| {
            let in_bucket: Vec<&&InvoiceRecord> = invoices
                .iter()
                .filter(|i| i.aging_bucket == bucket)
                .collect();
            if in_bucket.is_empty() {
                return None;
            }
            let bucket_total = sum_amounts(in_bucket.iter().map(|i| i.outstanding_amount));
            Some(AgingBucketSummary {
                bucket,
                count: in_bucket.len(),
                total_outstanding: bucket_total,
                percentage: percentage(bucket_total, total_outstanding),
            })
        })
        .collect();

    ReportSummary {
        total_invoices: invoices.len(),
        total_outstanding,
        avg_days_overdue,
        aging_buckets,
    }
}

/// Total of `amounts`, saturating at `Decimal::MAX` / `Decimal::MIN`
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |acc, amount| acc.saturating_add(amount))
}

/// `part / whole` as a whole-number percentage; 0 when `whole` is zero
///
/// Divides before scaling so amounts near `Decimal::MAX` cannot overflow.
pub fn percentage(part: Decimal, whole: Decimal) -> i64 {
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|pct| pct.to_i64())
        .unwrap_or(0)
}

/// Round to the nearest integer, ties toward positive infinity (-2.5 gives -2)
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn mean_days_overdue(invoices: &[InvoiceRecord]) -> i64 {
    if invoices.is_empty() {
        return 0;
    }
    let sum: i64 = invoices.iter().map(|i| i.days_overdue).sum();
    round_half_up(sum as f64 / invoices.len() as f64)
}

/// Mean of the group averages weighted by group size
fn weighted_average(groups: &[RegionGroup]) -> i64 {
    let count: usize = groups.iter().map(|g| g.summary.total_invoices).sum();
    if count == 0 {
        return 0;
    }
    let weighted: i64 = groups
        .iter()
        .map(|g| g.summary.avg_days_overdue * g.summary.total_invoices as i64)
        .sum();
    round_half_up(weighted as f64 / count as f64)
}
