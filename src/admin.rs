//! Account administration operations behind the CLI commands.
//!
//! Each operation resolves the account first (so a bad id surfaces as
//! `EntityNotFound`) except the bulk deletes, which are scoped by id and
//! simply affect zero rows for an unknown account.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::categories::CategoryManager;
use crate::config::{Config, Page};
use crate::error::{Error, Result};
use crate::models::{Account, Metrics, MentionCount, Note, Snapshot, TagCount};
use crate::stats::{AccountDaily, AccountDiff, DiffOutcome, DiffRecord, Granularity};
use crate::store::Store;
use crate::updater::AccountUpdater;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub account: Account,
    pub generated_at: DateTime<Utc>,
    pub last_daily_change: DiffOutcome,
    pub last_monthly_change: DiffOutcome,
    pub daily_stats: Vec<Snapshot>,
    pub daily_diff: DiffOutcome,
    pub daily_changes: Vec<DiffRecord>,
    pub monthly_diff: DiffOutcome,
    pub monthly_changes: Vec<DiffRecord>,
    pub notes: Vec<Note>,
}

fn months_before(now: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    now.checked_sub_months(Months::new(months))
        .ok_or_else(|| Error::InvalidInput(format!("cannot go back {months} months from {now}")))
}

pub fn dashboard(store: &Store, account_id: i64, config: &Config, now: DateTime<Utc>) -> Result<Dashboard> {
    let account = store.find_account(account_id)?;
    let daily_since = months_before(now, config.daily_lookback_months)?;
    let monthly_since = months_before(now, config.monthly_lookback_months)?;

    let mut daily = AccountDiff::new(store, [account.id], Granularity::Daily).with_now(now);
    daily.init_diff(daily_since)?;
    daily.init_last_diff()?;

    let mut monthly = AccountDiff::new(store, [account.id], Granularity::Monthly).with_now(now);
    monthly.init_diff(monthly_since)?;
    monthly.init_last_diff()?;

    let mut daily_stats = AccountDaily::new(store, [account.id]);
    daily_stats.init_data(daily_since)?;

    Ok(Dashboard {
        generated_at: now,
        last_daily_change: daily.get_last_diff(account.id)?,
        last_monthly_change: monthly.get_last_diff(account.id)?,
        daily_stats: daily_stats.series(account.id)?.to_vec(),
        daily_diff: daily.get_diff(account.id)?,
        daily_changes: daily.get_changes(account.id)?,
        monthly_diff: monthly.get_diff(account.id)?,
        monthly_changes: monthly.get_changes(account.id)?,
        notes: store.notes_for(account.id)?,
        account,
    })
}

pub fn add_account(store: &Store, username: &str, now: DateTime<Utc>) -> Result<Account> {
    if store.find_account_by_username(username.trim())?.is_some() {
        return Err(Error::InvalidInput(format!("account '{}' already exists", username.trim())));
    }

    let id = store.insert_account(username, now)?;
    store.find_account(id)
}

pub fn record_snapshot(
    store: &Store,
    account_id: i64,
    metrics: &Metrics,
    at: DateTime<Utc>,
) -> Result<i64> {
    store.find_account(account_id)?;
    store.insert_snapshot(account_id, metrics, at)
}

pub fn record_media(
    store: &mut Store,
    account_id: i64,
    shortcode: &str,
    tags: &[String],
    mentions: &[String],
    at: DateTime<Utc>,
) -> Result<i64> {
    store.find_account(account_id)?;
    store.insert_media(account_id, shortcode, tags, mentions, at)
}

/// Replace the acting user's note on an account.
pub fn update_note(
    store: &mut Store,
    account_id: i64,
    user_id: i64,
    text: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    store.find_account(account_id)?;
    store.replace_note(account_id, user_id, text, now)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsForm {
    pub disabled: bool,
    pub monitoring: bool,
    pub is_valid: bool,
}

impl SettingsForm {
    /// Form prefilled with the account's current settings.
    pub fn from_account(account: &Account) -> Self {
        SettingsForm {
            disabled: account.disabled,
            monitoring: account.monitoring,
            is_valid: account.is_valid,
        }
    }
}

/// Save settings. Disabling also stops monitoring; marking an account
/// valid asks for an immediate statistics collection.
pub fn apply_settings(
    store: &Store,
    account_id: i64,
    form: &SettingsForm,
    now: DateTime<Utc>,
) -> Result<Account> {
    store.find_account(account_id)?;

    let updater = if form.disabled {
        AccountUpdater::new(account_id)
            .set_disabled(true)
            .set_monitoring(false)
    } else if form.is_valid {
        AccountUpdater::new(account_id)
            .set_disabled(false)
            .set_monitoring(form.monitoring)
            .set_is_valid()
            .set_next_stats_update(None)
    } else {
        AccountUpdater::new(account_id)
            .set_disabled(false)
            .set_monitoring(form.monitoring)
            .set_invalid()
    };
    updater.save_at(store, now)?;
    tracing::info!(account_id, disabled = form.disabled, valid = form.is_valid, "saved settings");

    store.find_account(account_id)
}

/// Push an account's next collection one interval past `now`.
pub fn mark_updated(store: &Store, account_id: i64, config: &Config, now: DateTime<Utc>) -> Result<Account> {
    let interval = chrono::Duration::from_std(config.stats_update_interval()?)
        .map_err(|e| Error::Config(format!("stats_update_interval out of range: {e}")))?;

    AccountUpdater::new(account_id)
        .schedule_after(now, interval)
        .save_at(store, now)?;

    store.find_account(account_id)
}

pub fn delete_stats(store: &Store, account_id: i64) -> Result<usize> {
    store.delete_snapshots(account_id)
}

pub fn delete_associated(store: &Store, account_id: i64) -> Result<usize> {
    store.delete_media(account_id)
}

pub fn delete_account(store: &Store, account_id: i64) -> Result<()> {
    store.delete_account(account_id)
}

pub fn save_categories(store: &mut Store, account_id: i64, tags: &[String], user_id: i64) -> Result<()> {
    CategoryManager::new().save_for_account(store, account_id, tags, user_id)
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsPage {
    pub account: Account,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub rows: Vec<Snapshot>,
}

/// One page of an account's snapshots, newest first.
pub fn stats_page(store: &Store, account_id: i64, page: Page) -> Result<StatsPage> {
    let account = store.find_account(account_id)?;

    Ok(StatsPage {
        total: store.count_snapshots(account.id)?,
        rows: store.list_snapshots(account.id, page.size, page.offset())?,
        page: page.number,
        per_page: page.size,
        account,
    })
}

/// Every snapshot of an account, newest first.
pub fn all_stats(store: &Store, account_id: i64) -> Result<(Account, Vec<Snapshot>)> {
    let account = store.find_account(account_id)?;
    let rows = store.list_snapshots(account.id, u32::MAX, 0)?;
    Ok((account, rows))
}

pub fn media_tags(store: &Store, account_id: i64) -> Result<(Account, Vec<TagCount>)> {
    let account = store.find_account(account_id)?;
    let tags = store.media_tag_counts(account.id)?;
    Ok((account, tags))
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaAccounts {
    pub account: Account,
    pub mentions: Vec<MentionCount>,
    /// Categories the acting user gave the mentioned accounts.
    pub categories: BTreeMap<i64, Vec<String>>,
}

pub fn media_accounts(store: &Store, account_id: i64, user_id: i64) -> Result<MediaAccounts> {
    let account = store.find_account(account_id)?;

    Ok(MediaAccounts {
        mentions: store.media_mention_counts(account.id)?,
        categories: CategoryManager::new().get_for_user_accounts(store, user_id, account.id)?,
        account,
    })
}
