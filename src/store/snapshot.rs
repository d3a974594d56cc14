use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter};

use super::{placeholders, timestamp_at, Store};
use crate::error::Result;
use crate::models::{Metrics, Snapshot};
use crate::stats::Granularity;

const SNAPSHOT_COLUMNS: &str = "id, account_id, followed_by, follows, media, er, created_at";

/// Which snapshots of the requested accounts a bulk query returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeFilter {
    /// Every snapshot captured at or after `since`.
    Since(DateTime<Utc>),
    /// The latest snapshot at or before `reference` plus every later one up
    /// to `until`. Accounts with nothing at or before `reference` get all
    /// of their snapshots in `(reference, until]`.
    Anchored {
        reference: DateTime<Utc>,
        until: DateTime<Utc>,
    },
    /// The latest snapshot of each of the `count` most recent buckets
    /// at or before `until`.
    LatestBuckets {
        granularity: Granularity,
        count: u32,
        until: DateTime<Utc>,
    },
}

/// Read access to stored snapshots. Results are ordered by account, then
/// ascending capture time.
pub trait SnapshotSource {
    /// One round trip for any number of accounts.
    fn find_snapshots(&self, account_ids: &[i64], filter: &TimeFilter) -> Result<Vec<Snapshot>>;
}

impl SnapshotSource for Store {
    fn find_snapshots(&self, account_ids: &[i64], filter: &TimeFilter) -> Result<Vec<Snapshot>> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = placeholders(account_ids.len());
        let mut args: Vec<i64> = account_ids.to_vec();

        let sql = match filter {
            TimeFilter::Since(since) => {
                args.push(since.timestamp());
                format!(
                    "SELECT {SNAPSHOT_COLUMNS}
                     FROM account_stats
                     WHERE account_id IN ({ids}) AND created_at >= ?
                     ORDER BY account_id, created_at, id"
                )
            }
            TimeFilter::Anchored { reference, until } => {
                args.push(until.timestamp());
                args.push(reference.timestamp());
                args.push(reference.timestamp());
                format!(
                    "SELECT {SNAPSHOT_COLUMNS}
                     FROM account_stats s
                     WHERE s.account_id IN ({ids})
                       AND s.created_at <= ?
                       AND s.created_at >= COALESCE(
                           (SELECT MAX(p.created_at) FROM account_stats p
                            WHERE p.account_id = s.account_id AND p.created_at <= ?),
                           ?)
                     ORDER BY s.account_id, s.created_at, s.id"
                )
            }
            TimeFilter::LatestBuckets { granularity, count, until } => {
                args.push(until.timestamp());
                args.push(i64::from(*count));
                let bucket = granularity.strategy().sqlite_bucket_format();
                format!(
                    "WITH bucketed AS (
                         SELECT {SNAPSHOT_COLUMNS},
                                ROW_NUMBER() OVER (
                                    PARTITION BY account_id, strftime('{bucket}', created_at, 'unixepoch')
                                    ORDER BY created_at DESC, id DESC
                                ) AS bucket_pos
                         FROM account_stats
                         WHERE account_id IN ({ids}) AND created_at <= ?
                     ), ranked AS (
                         SELECT {SNAPSHOT_COLUMNS},
                                ROW_NUMBER() OVER (
                                    PARTITION BY account_id
                                    ORDER BY created_at DESC, id DESC
                                ) AS recency
                         FROM bucketed
                         WHERE bucket_pos = 1
                     )
                     SELECT {SNAPSHOT_COLUMNS}
                     FROM ranked
                     WHERE recency <= ?
                     ORDER BY account_id, created_at, id"
                )
            }
        };

        let mut stmt = self.conn().prepare_cached(&sql)?;
        let snapshots = stmt
            .query_map(params_from_iter(args.iter()), snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(
            accounts = account_ids.len(),
            rows = snapshots.len(),
            ?filter,
            "loaded snapshots"
        );

        Ok(snapshots)
    }
}

impl Store {
    /// Record a statistics snapshot for an account.
    pub fn insert_snapshot(
        &self,
        account_id: i64,
        metrics: &Metrics,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO account_stats (account_id, followed_by, follows, media, er, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                account_id,
                metrics.followed_by,
                metrics.follows,
                metrics.media,
                metrics.er,
                created_at.timestamp()
            ],
        )?;

        Ok(self.conn().last_insert_rowid())
    }

    /// Snapshots of one account, newest first.
    pub fn list_snapshots(&self, account_id: i64, limit: u32, offset: u64) -> Result<Vec<Snapshot>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {SNAPSHOT_COLUMNS}
             FROM account_stats
             WHERE account_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let snapshots = stmt
            .query_map(
                params![account_id, limit, i64::try_from(offset).unwrap_or(i64::MAX)],
                snapshot_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(snapshots)
    }

    pub fn count_snapshots(&self, account_id: i64) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM account_stats WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }

    /// Remove every snapshot of an account in one statement.
    pub fn delete_snapshots(&self, account_id: i64) -> Result<usize> {
        let deleted = self
            .conn()
            .execute("DELETE FROM account_stats WHERE account_id = ?1", params![account_id])?;

        tracing::info!(account_id, deleted, "deleted account stats");
        Ok(deleted)
    }
}

fn snapshot_from_row(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        account_id: row.get(1)?,
        metrics: Metrics {
            followed_by: row.get(2)?,
            follows: row.get(3)?,
            media: row.get(4)?,
            er: row.get(5)?,
        },
        created_at: timestamp_at(row, 6)?,
    })
}
