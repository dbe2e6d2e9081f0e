//! Invoice normalization: overdue day counts and aging buckets
//!
//! Every bucket classification in the crate goes through
//! [`AgingBucket::from_days_overdue`], at ingestion and at query time alike.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{AgingBucket, InvoiceCandidate};

/// Whole days between `due` and `today`; negative when not yet due
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> i64 {
    (today - due).num_days()
}

impl AgingBucket {
    /// Classify a day count: <=0 current, 1-45, 46-90, >90 over90
    pub fn from_days_overdue(days: i64) -> Self {
        match days {
            d if d <= 0 => Self::Current,
            1..=45 => Self::Days1To45,
            46..=90 => Self::Days46To90,
            _ => Self::Over90,
        }
    }
}

/// Derived fields for one invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aging {
    pub days_overdue: i64,
    pub bucket: AgingBucket,
}

impl Aging {
    /// Age a due date against `now`; the time of day is ignored
    pub fn compute(due: NaiveDate, now: NaiveDateTime) -> Self {
        let days = days_overdue(due, now.date());
        Self {
            days_overdue: days,
            bucket: AgingBucket::from_days_overdue(days),
        }
    }
}

/// Age a decoded candidate against `now`
pub fn age_invoice(candidate: &InvoiceCandidate, now: NaiveDateTime) -> Aging {
    Aging::compute(candidate.due_date, now)
}
