use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{optional_timestamp_at, timestamp_at, Store};
use crate::error::{Error, Result};
use crate::models::{Account, Note};

const ACCOUNT_COLUMNS: &str =
    "id, username, disabled, monitoring, is_valid, next_stats_update, created_at, updated_at";

impl Store {
    pub fn insert_account(&self, username: &str, now: DateTime<Utc>) -> Result<i64> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }

        self.conn().execute(
            "INSERT INTO accounts (username, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![username, now.timestamp()],
        )?;

        let id = self.conn().last_insert_rowid();
        tracing::info!(id, username, "added account");
        Ok(id)
    }

    /// Look up an account, failing with `EntityNotFound` when it does not exist.
    pub fn find_account(&self, id: i64) -> Result<Account> {
        self.conn()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )
            .optional()?
            .ok_or(Error::EntityNotFound(id))
    }

    pub fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let account = self
            .conn()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
                params![username],
                account_from_row,
            )
            .optional()?;

        Ok(account)
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY username"))?;

        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(accounts)
    }

    /// Delete an account; stats, notes, media and category links cascade.
    pub fn delete_account(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM accounts WHERE id = ?1", params![id])?;

        if deleted == 0 {
            return Err(Error::EntityNotFound(id));
        }

        tracing::info!(id, "deleted account");
        Ok(())
    }

    /// Monitored, enabled accounts whose next statistics collection is due.
    pub fn due_accounts(&self, now: DateTime<Utc>) -> Result<Vec<Account>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE monitoring = 1 AND disabled = 0
               AND (next_stats_update IS NULL OR next_stats_update <= ?1)
             ORDER BY next_stats_update IS NOT NULL, next_stats_update, id"
        ))?;

        let accounts = stmt
            .query_map(params![now.timestamp()], account_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(accounts)
    }

    /// Replace the note a user keeps on an account.
    pub fn replace_note(
        &mut self,
        account_id: i64,
        user_id: i64,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "DELETE FROM account_notes WHERE account_id = ?1 AND user_id = ?2",
            params![account_id, user_id],
        )?;

        tx.execute(
            "INSERT INTO account_notes (account_id, user_id, note, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![account_id, user_id, note, now.timestamp()],
        )?;

        let note_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(note_id)
    }

    pub fn notes_for(&self, account_id: i64) -> Result<Vec<Note>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, account_id, user_id, note, created_at
             FROM account_notes
             WHERE account_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let notes = stmt
            .query_map(params![account_id], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    user_id: row.get(2)?,
                    note: row.get(3)?,
                    created_at: timestamp_at(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }
}

fn account_from_row(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        disabled: row.get(2)?,
        monitoring: row.get(3)?,
        is_valid: row.get(4)?,
        next_stats_update: optional_timestamp_at(row, 5)?,
        created_at: timestamp_at(row, 6)?,
        updated_at: timestamp_at(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metrics;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn inserted_account_has_defaults() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert_account("  Alice ", now()).unwrap();

        let account = store.find_account(id).unwrap();
        assert_eq!(account.username, "Alice");
        assert!(account.monitoring);
        assert!(account.is_valid);
        assert!(!account.disabled);
        assert_eq!(account.next_stats_update, None);
        assert_eq!(account.created_at, now());
    }

    #[test]
    fn empty_username_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.insert_account("   ", now()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_account_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(store.find_account(42), Err(Error::EntityNotFound(42))));
        assert!(matches!(store.delete_account(42), Err(Error::EntityNotFound(42))));
    }

    #[test]
    fn delete_cascades_to_stats_and_notes() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.insert_account("alice", now()).unwrap();
        store.insert_snapshot(id, &Metrics::default(), now()).unwrap();
        store.replace_note(id, 1, "watch", now()).unwrap();

        store.delete_account(id).unwrap();

        assert_eq!(store.count_snapshots(id).unwrap(), 0);
        assert!(store.notes_for(id).unwrap().is_empty());
    }

    #[test]
    fn replace_note_keeps_one_note_per_user() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.insert_account("alice", now()).unwrap();

        store.replace_note(id, 1, "first", now()).unwrap();
        store.replace_note(id, 1, "second", now()).unwrap();
        store.replace_note(id, 2, "other user", now()).unwrap();

        let notes = store.notes_for(id).unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().any(|n| n.user_id == 1 && n.note == "second"));
        assert!(!notes.iter().any(|n| n.note == "first"));
    }

    #[test]
    fn due_accounts_include_unscheduled_and_overdue() {
        let store = Store::open_in_memory().unwrap();
        let unscheduled = store.insert_account("a", now()).unwrap();
        let overdue = store.insert_account("b", now()).unwrap();
        let future = store.insert_account("c", now()).unwrap();
        let off = store.insert_account("d", now()).unwrap();

        store
            .conn()
            .execute(
                "UPDATE accounts SET next_stats_update = ?1 WHERE id = ?2",
                params![(now() - Duration::hours(1)).timestamp(), overdue],
            )
            .unwrap();
        store
            .conn()
            .execute(
                "UPDATE accounts SET next_stats_update = ?1 WHERE id = ?2",
                params![(now() + Duration::hours(1)).timestamp(), future],
            )
            .unwrap();
        store
            .conn()
            .execute("UPDATE accounts SET monitoring = 0 WHERE id = ?1", params![off])
            .unwrap();

        let due: Vec<i64> = store.due_accounts(now()).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(due, vec![unscheduled, overdue]);
    }
}
