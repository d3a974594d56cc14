use chrono::{DateTime, Utc};
use rusqlite::params;

use super::Store;
use crate::error::Result;
use crate::models::{MentionCount, TagCount};

impl Store {
    /// Record one collected post with its tags and mentioned usernames.
    /// Mentioned usernames without an account are added unmonitored.
    pub fn insert_media(
        &mut self,
        account_id: i64,
        shortcode: &str,
        tags: &[String],
        mentions: &[String],
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO media (account_id, shortcode, created_at) VALUES (?1, ?2, ?3)",
            params![account_id, shortcode, created_at.timestamp()],
        )?;
        let media_id = tx.last_insert_rowid();

        {
            let mut insert_tag = tx.prepare_cached("INSERT OR IGNORE INTO tags (name) VALUES (?1)")?;
            let mut link_tag = tx.prepare_cached(
                "INSERT OR IGNORE INTO media_tags (media_id, tag_id)
                 SELECT ?1, id FROM tags WHERE name = ?2",
            )?;

            for tag in tags.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
                insert_tag.execute(params![tag])?;
                link_tag.execute(params![media_id, tag])?;
            }

            let mut insert_account = tx.prepare_cached(
                "INSERT OR IGNORE INTO accounts (username, monitoring, created_at, updated_at)
                 VALUES (?1, 0, ?2, ?2)",
            )?;
            let mut link_account = tx.prepare_cached(
                "INSERT OR IGNORE INTO media_accounts (media_id, account_id)
                 SELECT ?1, id FROM accounts WHERE username = ?2",
            )?;

            for username in mentions.iter().map(|m| m.trim()).filter(|m| !m.is_empty()) {
                insert_account.execute(params![username, created_at.timestamp()])?;
                link_account.execute(params![media_id, username])?;
            }
        }

        tx.commit()?;
        Ok(media_id)
    }

    pub fn count_media(&self, account_id: i64) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM media WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }

    /// Remove every collected post of an account in one statement.
    pub fn delete_media(&self, account_id: i64) -> Result<usize> {
        let deleted = self
            .conn()
            .execute("DELETE FROM media WHERE account_id = ?1", params![account_id])?;

        tracing::info!(account_id, deleted, "deleted associated media");
        Ok(deleted)
    }

    /// Tags used in an account's media, most used first.
    pub fn media_tag_counts(&self, account_id: i64) -> Result<Vec<TagCount>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT tags.name, COUNT(tags.id) AS occurs
             FROM tags
             INNER JOIN media_tags ON tags.id = media_tags.tag_id
             INNER JOIN media ON media_tags.media_id = media.id
             WHERE media.account_id = ?1
             GROUP BY tags.id
             ORDER BY occurs DESC, tags.name ASC",
        )?;

        let counts = stmt
            .query_map(params![account_id], |row| {
                Ok(TagCount {
                    name: row.get(0)?,
                    occurs: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }

    /// Accounts mentioned in an account's media, most mentioned first.
    pub fn media_mention_counts(&self, account_id: i64) -> Result<Vec<MentionCount>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT accounts.id, accounts.username, COUNT(accounts.id) AS occurs
             FROM accounts
             INNER JOIN media_accounts ON accounts.id = media_accounts.account_id
             INNER JOIN media ON media_accounts.media_id = media.id
             WHERE media.account_id = ?1
             GROUP BY accounts.id
             ORDER BY occurs DESC, accounts.username ASC",
        )?;

        let counts = stmt
            .query_map(params![account_id], |row| {
                Ok(MentionCount {
                    account_id: row.get(0)?,
                    username: row.get(1)?,
                    occurs: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn seeded() -> (Store, i64) {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.insert_account("alice", now()).unwrap();

        store
            .insert_media(id, "p1", &strings(&["travel", "food"]), &strings(&["bob"]), now())
            .unwrap();
        store
            .insert_media(id, "p2", &strings(&["Food", " "]), &strings(&["bob", "carol"]), now())
            .unwrap();
        store
            .insert_media(id, "p3", &strings(&["art"]), &[], now())
            .unwrap();

        (store, id)
    }

    #[test]
    fn tag_counts_order_by_occurrence_then_name() {
        let (store, id) = seeded();
        let counts = store.media_tag_counts(id).unwrap();

        let pairs: Vec<(&str, i64)> = counts.iter().map(|c| (c.name.as_str(), c.occurs)).collect();
        assert_eq!(pairs, vec![("food", 2), ("art", 1), ("travel", 1)]);
    }

    #[test]
    fn mentions_create_unmonitored_accounts() {
        let (store, id) = seeded();
        let counts = store.media_mention_counts(id).unwrap();

        let pairs: Vec<(&str, i64)> =
            counts.iter().map(|c| (c.username.as_str(), c.occurs)).collect();
        assert_eq!(pairs, vec![("bob", 2), ("carol", 1)]);

        let bob = store.find_account_by_username("bob").unwrap().unwrap();
        assert!(!bob.monitoring);
    }

    #[test]
    fn delete_media_removes_links() {
        let (store, id) = seeded();
        assert_eq!(store.delete_media(id).unwrap(), 3);
        assert_eq!(store.count_media(id).unwrap(), 0);
        assert!(store.media_tag_counts(id).unwrap().is_empty());
        assert!(store.media_mention_counts(id).unwrap().is_empty());
    }
}
