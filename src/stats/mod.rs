//! Statistics engine over stored account snapshots.
//!
//! - `diff`: period-over-period deltas at daily or monthly granularity
//! - `daily`: per-day series for charts
//!
//! Both load everything they need for any number of accounts with a single
//! bulk query and never write to the store.

pub mod daily;
pub mod diff;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Snapshot;

pub use daily::AccountDaily;
pub use diff::{AccountDiff, DiffOutcome, DiffRecord};

/// Bucketing unit for comparisons. Buckets are UTC calendar days or months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    pub fn strategy(self) -> &'static dyn DiffStrategy {
        match self {
            Granularity::Daily => &DailyStrategy,
            Granularity::Monthly => &MonthlyStrategy,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.strategy().label()
    }
}

/// How one granularity groups snapshots into buckets.
pub trait DiffStrategy: Sync {
    fn granularity(&self) -> Granularity;
    fn label(&self) -> &'static str;
    /// First calendar day of the bucket containing `at`.
    fn bucket_start(&self, at: DateTime<Utc>) -> NaiveDate;
    /// `strftime` pattern producing the same buckets inside SQLite.
    fn sqlite_bucket_format(&self) -> &'static str;
    /// How far back a dashboard compares by default.
    fn default_lookback_months(&self) -> u32;
}

pub struct DailyStrategy;

impl DiffStrategy for DailyStrategy {
    fn granularity(&self) -> Granularity {
        Granularity::Daily
    }

    fn label(&self) -> &'static str {
        "daily"
    }

    fn bucket_start(&self, at: DateTime<Utc>) -> NaiveDate {
        at.date_naive()
    }

    fn sqlite_bucket_format(&self) -> &'static str {
        "%Y-%m-%d"
    }

    fn default_lookback_months(&self) -> u32 {
        1
    }
}

pub struct MonthlyStrategy;

impl DiffStrategy for MonthlyStrategy {
    fn granularity(&self) -> Granularity {
        Granularity::Monthly
    }

    fn label(&self) -> &'static str {
        "monthly"
    }

    fn bucket_start(&self, at: DateTime<Utc>) -> NaiveDate {
        let date = at.date_naive();
        date.with_day(1).unwrap_or(date)
    }

    fn sqlite_bucket_format(&self) -> &'static str {
        "%Y-%m"
    }

    fn default_lookback_months(&self) -> u32 {
        12
    }
}

/// Split rows ordered by account into per-account vectors, keeping order.
pub(crate) fn group_by_account(rows: Vec<Snapshot>) -> BTreeMap<i64, Vec<Snapshot>> {
    let mut grouped: BTreeMap<i64, Vec<Snapshot>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.account_id).or_default().push(row);
    }
    grouped
}

/// Keep the latest snapshot of every bucket. Input must be ascending by time.
pub(crate) fn collapse_buckets(strategy: &dyn DiffStrategy, snapshots: &[Snapshot]) -> Vec<Snapshot> {
    let mut collapsed: Vec<Snapshot> = Vec::with_capacity(snapshots.len());

    for snapshot in snapshots {
        let bucket = strategy.bucket_start(snapshot.created_at);
        match collapsed.last_mut() {
            Some(last) if strategy.bucket_start(last.created_at) == bucket => {
                *last = snapshot.clone();
            }
            _ => collapsed.push(snapshot.clone()),
        }
    }

    collapsed
}

/// Dedupe ids while keeping first-seen order.
pub(crate) fn unique_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::Result;
    use crate::models::Metrics;
    use crate::store::{SnapshotSource, Store, TimeFilter};
    use chrono::TimeZone;
    use std::cell::Cell;

    pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    pub fn followers(n: i64) -> Metrics {
        Metrics { followed_by: n, follows: 50, media: 10, er: 2.5 }
    }

    /// Store wrapper counting bulk queries.
    pub struct CountingSource {
        pub store: Store,
        pub calls: Cell<usize>,
    }

    impl CountingSource {
        pub fn new(store: Store) -> Self {
            CountingSource { store, calls: Cell::new(0) }
        }
    }

    impl SnapshotSource for CountingSource {
        fn find_snapshots(&self, account_ids: &[i64], filter: &TimeFilter) -> Result<Vec<Snapshot>> {
            self.calls.set(self.calls.get() + 1);
            self.store.find_snapshots(account_ids, filter)
        }
    }
}
