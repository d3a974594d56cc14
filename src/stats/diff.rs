//! Snapshot comparison engine.
//!
//! An `AccountDiff` is bound to a set of accounts and a granularity and
//! answers two questions per account:
//! - `init_diff`/`get_diff`: change between the snapshot at a reference time
//!   and the latest snapshot
//! - `init_last_diff`/`get_last_diff`: change between the last two buckets
//!   that have data
//!
//! Each initializer issues exactly one bulk query for all accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::{collapse_buckets, group_by_account, unique_ids, DiffStrategy, Granularity};
use crate::error::{Error, Result};
use crate::models::{MetricsDelta, Snapshot};
use crate::store::{SnapshotSource, TimeFilter};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRecord {
    pub account_id: i64,
    pub from: Snapshot,
    pub to: Snapshot,
    pub delta: MetricsDelta,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl DiffRecord {
    pub fn between(from: &Snapshot, to: &Snapshot) -> Self {
        DiffRecord {
            account_id: to.account_id,
            delta: to.metrics.delta_since(&from.metrics),
            period_start: from.created_at,
            period_end: to.created_at,
            from: from.clone(),
            to: to.clone(),
        }
    }

    /// Both ends are the same stored snapshot.
    pub fn is_same_snapshot(&self) -> bool {
        self.from.id == self.to.id
    }
}

/// Result of a comparison. `NoData` means there was nothing to compare and
/// is a regular outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "diff", rename_all = "snake_case")]
pub enum DiffOutcome {
    Available(DiffRecord),
    NoData,
}

impl DiffOutcome {
    pub fn record(&self) -> Option<&DiffRecord> {
        match self {
            DiffOutcome::Available(record) => Some(record),
            DiffOutcome::NoData => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DiffOutcome::Available(_))
    }
}

struct WindowDiff {
    outcome: DiffOutcome,
    changes: Vec<DiffRecord>,
}

pub struct AccountDiff<'a, S: SnapshotSource + ?Sized> {
    source: &'a S,
    account_ids: Vec<i64>,
    strategy: &'static dyn DiffStrategy,
    now: DateTime<Utc>,
    window: Option<HashMap<i64, WindowDiff>>,
    last: Option<HashMap<i64, DiffOutcome>>,
}

impl<'a, S: SnapshotSource + ?Sized> AccountDiff<'a, S> {
    pub fn new(
        source: &'a S,
        account_ids: impl IntoIterator<Item = i64>,
        granularity: Granularity,
    ) -> Self {
        AccountDiff {
            source,
            account_ids: unique_ids(account_ids),
            strategy: granularity.strategy(),
            now: Utc::now(),
            window: None,
            last: None,
        }
    }

    /// Compare against `now` instead of the wall clock.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn granularity(&self) -> Granularity {
        self.strategy.granularity()
    }

    /// Prepare per-account diffs from the snapshot at `reference` to the
    /// latest one. When an account has nothing at or before `reference`
    /// its first later snapshot is the starting point.
    pub fn init_diff(&mut self, reference: DateTime<Utc>) -> Result<()> {
        let filter = TimeFilter::Anchored { reference, until: self.now };
        let grouped = group_by_account(self.source.find_snapshots(&self.account_ids, &filter)?);

        let window = self
            .account_ids
            .iter()
            .map(|id| {
                let snapshots = grouped.get(id).map(Vec::as_slice).unwrap_or(&[]);
                let diff = WindowDiff {
                    outcome: reference_outcome(snapshots, reference),
                    changes: bucket_changes(self.strategy, snapshots),
                };
                (*id, diff)
            })
            .collect();

        tracing::debug!(
            granularity = self.strategy.label(),
            accounts = self.account_ids.len(),
            %reference,
            "initialized diff"
        );

        self.window = Some(window);
        Ok(())
    }

    pub fn get_diff(&self, account_id: i64) -> Result<DiffOutcome> {
        let window = self
            .window
            .as_ref()
            .ok_or(Error::Precondition("get_diff called before init_diff"))?;

        Ok(window
            .get(&account_id)
            .map(|diff| diff.outcome.clone())
            .unwrap_or(DiffOutcome::NoData))
    }

    /// Bucket-over-bucket changes across the window loaded by `init_diff`,
    /// oldest first.
    pub fn get_changes(&self, account_id: i64) -> Result<Vec<DiffRecord>> {
        let window = self
            .window
            .as_ref()
            .ok_or(Error::Precondition("get_changes called before init_diff"))?;

        Ok(window
            .get(&account_id)
            .map(|diff| diff.changes.clone())
            .unwrap_or_default())
    }

    /// Prepare per-account diffs between the two most recent buckets.
    pub fn init_last_diff(&mut self) -> Result<()> {
        let filter = TimeFilter::LatestBuckets {
            granularity: self.strategy.granularity(),
            count: 2,
            until: self.now,
        };
        let grouped = group_by_account(self.source.find_snapshots(&self.account_ids, &filter)?);

        let last = self
            .account_ids
            .iter()
            .map(|id| {
                let outcome = match grouped.get(id).map(Vec::as_slice) {
                    Some([.., previous, latest]) => {
                        DiffOutcome::Available(DiffRecord::between(previous, latest))
                    }
                    _ => DiffOutcome::NoData,
                };
                (*id, outcome)
            })
            .collect();

        tracing::debug!(
            granularity = self.strategy.label(),
            accounts = self.account_ids.len(),
            "initialized last diff"
        );

        self.last = Some(last);
        Ok(())
    }

    pub fn get_last_diff(&self, account_id: i64) -> Result<DiffOutcome> {
        let last = self
            .last
            .as_ref()
            .ok_or(Error::Precondition("get_last_diff called before init_last_diff"))?;

        Ok(last.get(&account_id).cloned().unwrap_or(DiffOutcome::NoData))
    }
}

fn reference_outcome(snapshots: &[Snapshot], reference: DateTime<Utc>) -> DiffOutcome {
    let (Some(first), Some(latest)) = (snapshots.first(), snapshots.last()) else {
        return DiffOutcome::NoData;
    };

    let from = snapshots
        .iter()
        .rev()
        .find(|s| s.created_at <= reference)
        .unwrap_or(first);

    DiffOutcome::Available(DiffRecord::between(from, latest))
}

fn bucket_changes(strategy: &dyn DiffStrategy, snapshots: &[Snapshot]) -> Vec<DiffRecord> {
    collapse_buckets(strategy, snapshots)
        .windows(2)
        .map(|pair| DiffRecord::between(&pair[0], &pair[1]))
        .collect()
}
