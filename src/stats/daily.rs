//! Per-day statistics series for dashboard charts.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::{collapse_buckets, group_by_account, unique_ids, DailyStrategy};
use crate::error::{Error, Result};
use crate::models::Snapshot;
use crate::store::{SnapshotSource, TimeFilter};

pub struct AccountDaily<'a, S: SnapshotSource + ?Sized> {
    source: &'a S,
    account_ids: Vec<i64>,
    series: Option<BTreeMap<i64, Vec<Snapshot>>>,
}

impl<'a, S: SnapshotSource + ?Sized> AccountDaily<'a, S> {
    pub fn new(source: &'a S, account_ids: impl IntoIterator<Item = i64>) -> Self {
        AccountDaily {
            source,
            account_ids: unique_ids(account_ids),
            series: None,
        }
    }

    /// Load every snapshot captured at or after `since`, one per day
    /// (the latest of the day).
    pub fn init_data(&mut self, since: DateTime<Utc>) -> Result<()> {
        let mut grouped =
            group_by_account(self.source.find_snapshots(&self.account_ids, &TimeFilter::Since(since))?);

        let series = self
            .account_ids
            .iter()
            .map(|id| {
                let snapshots = grouped.remove(id).unwrap_or_default();
                (*id, collapse_buckets(&DailyStrategy, &snapshots))
            })
            .collect();

        self.series = Some(series);
        Ok(())
    }

    /// Series for every requested account, ascending. Accounts without data
    /// map to an empty series.
    pub fn get(&self) -> Result<&BTreeMap<i64, Vec<Snapshot>>> {
        self.series
            .as_ref()
            .ok_or(Error::Precondition("get called before init_data"))
    }

    pub fn series(&self, account_id: i64) -> Result<&[Snapshot]> {
        Ok(self.get()?.get(&account_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn into_series(self) -> Option<BTreeMap<i64, Vec<Snapshot>>> {
        self.series
    }
}
