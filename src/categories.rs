//! Per-user categories attached to accounts.

use rusqlite::params;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::store::Store;

#[derive(Debug, Default, Clone, Copy)]
pub struct CategoryManager;

impl CategoryManager {
    pub fn new() -> Self {
        CategoryManager
    }

    /// Replace the categories `user_id` has on an account with `tags`.
    /// Saving the same list twice changes nothing the second time.
    pub fn save_for_account(
        &self,
        store: &mut Store,
        account_id: i64,
        tags: &[String],
        user_id: i64,
    ) -> Result<()> {
        store.find_account(account_id)?;

        let wanted: BTreeSet<String> = tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let tx = store.conn_mut().transaction()?;
        {
            let mut existing_stmt = tx.prepare_cached(
                "SELECT categories.name
                 FROM account_categories
                 INNER JOIN categories ON categories.id = account_categories.category_id
                 WHERE account_categories.account_id = ?1 AND categories.user_id = ?2",
            )?;
            let existing = existing_stmt
                .query_map(params![account_id, user_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<BTreeSet<_>>>()?;

            let mut unlink = tx.prepare_cached(
                "DELETE FROM account_categories
                 WHERE account_id = ?1
                   AND category_id = (SELECT id FROM categories WHERE user_id = ?2 AND name = ?3)",
            )?;
            for name in existing.difference(&wanted) {
                unlink.execute(params![account_id, user_id, name])?;
            }

            let mut create =
                tx.prepare_cached("INSERT OR IGNORE INTO categories (user_id, name) VALUES (?1, ?2)")?;
            let mut link = tx.prepare_cached(
                "INSERT OR IGNORE INTO account_categories (account_id, category_id)
                 SELECT ?1, id FROM categories WHERE user_id = ?2 AND name = ?3",
            )?;
            for name in wanted.difference(&existing) {
                create.execute(params![user_id, name])?;
                link.execute(params![account_id, user_id, name])?;
            }
        }
        tx.commit()?;

        tracing::debug!(account_id, user_id, categories = wanted.len(), "saved account categories");
        Ok(())
    }

    /// Categories `user_id` has on the accounts mentioned in an account's media.
    pub fn get_for_user_accounts(
        &self,
        store: &Store,
        user_id: i64,
        account_id: i64,
    ) -> Result<BTreeMap<i64, Vec<String>>> {
        let mut stmt = store.conn().prepare_cached(
            "SELECT DISTINCT account_categories.account_id, categories.name
             FROM account_categories
             INNER JOIN categories ON categories.id = account_categories.category_id
             WHERE categories.user_id = ?1
               AND account_categories.account_id IN (
                   SELECT media_accounts.account_id
                   FROM media_accounts
                   INNER JOIN media ON media.id = media_accounts.media_id
                   WHERE media.account_id = ?2
               )
             ORDER BY account_categories.account_id, categories.name",
        )?;

        let mut assigned: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        let rows = stmt.query_map(params![user_id, account_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (related, name) = row?;
            assigned.entry(related).or_default().push(name);
        }

        Ok(assigned)
    }

    /// Category names `user_id` has on one account.
    pub fn for_account(&self, store: &Store, user_id: i64, account_id: i64) -> Result<Vec<String>> {
        let mut stmt = store.conn().prepare_cached(
            "SELECT categories.name
             FROM account_categories
             INNER JOIN categories ON categories.id = account_categories.category_id
             WHERE account_categories.account_id = ?1 AND categories.user_id = ?2
             ORDER BY categories.name",
        )?;

        let names = stmt
            .query_map(params![account_id, user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(names)
    }
}
