//! Staged account field changes committed in one statement.
//!
//! Settings changes and the statistics schedule hint go through
//! `AccountUpdater`: every setter stages a column, `save` writes all staged
//! columns plus `updated_at` with a single `UPDATE ... WHERE id = ?`, so a
//! concurrent writer sees either all of them or none (last write wins).
//! The updater only records when the next collection is due; the external
//! collector reads it through `Store::due_accounts`.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::error::{Error, Result};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdater {
    account_id: i64,
    changes: Vec<(&'static str, Value)>,
}

impl AccountUpdater {
    pub fn new(account_id: i64) -> Self {
        AccountUpdater {
            account_id,
            changes: Vec::new(),
        }
    }

    fn stage(mut self, column: &'static str, value: Value) -> Self {
        match self.changes.iter_mut().find(|(staged, _)| *staged == column) {
            Some(change) => change.1 = value,
            None => self.changes.push((column, value)),
        }
        self
    }

    pub fn set_is_valid(self) -> Self {
        self.stage("is_valid", Value::Integer(1))
    }

    pub fn set_invalid(self) -> Self {
        self.stage("is_valid", Value::Integer(0))
    }

    pub fn set_monitoring(self, monitoring: bool) -> Self {
        self.stage("monitoring", Value::Integer(i64::from(monitoring)))
    }

    pub fn set_disabled(self, disabled: bool) -> Self {
        self.stage("disabled", Value::Integer(i64::from(disabled)))
    }

    /// `None` asks the collector to fetch statistics as soon as possible.
    pub fn set_next_stats_update(self, at: Option<DateTime<Utc>>) -> Self {
        let value = at.map_or(Value::Null, |at| Value::Integer(at.timestamp()));
        self.stage("next_stats_update", value)
    }

    pub fn schedule_after(self, now: DateTime<Utc>, interval: Duration) -> Self {
        self.set_next_stats_update(Some(now + interval))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn save(self, store: &Store) -> Result<()> {
        self.save_at(store, Utc::now())
    }

    /// Commit every staged change with `updated_at = now`.
    pub fn save_at(self, store: &Store, now: DateTime<Utc>) -> Result<()> {
        if self.changes.is_empty() {
            store.find_account(self.account_id)?;
            return Ok(());
        }

        let assignments: Vec<String> = self
            .changes
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect();

        let sql = format!(
            "UPDATE accounts SET {}, updated_at = ? WHERE id = ?",
            assignments.join(", ")
        );

        let columns: Vec<&str> = self.changes.iter().map(|(column, _)| *column).collect();
        let mut args: Vec<Value> = self.changes.into_iter().map(|(_, value)| value).collect();
        args.push(Value::Integer(now.timestamp()));
        args.push(Value::Integer(self.account_id));

        let updated = store.conn().execute(&sql, params_from_iter(args.iter()))?;
        if updated == 0 {
            return Err(Error::EntityNotFound(self.account_id));
        }

        tracing::debug!(account_id = self.account_id, ?columns, "saved account changes");
        Ok(())
    }
}
