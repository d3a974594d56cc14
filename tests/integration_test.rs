use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use tally::admin::{self, SettingsForm};
use tally::config::Config;
use tally::models::Metrics;
use tally::report::csv;
use tally::stats::{AccountDaily, AccountDiff, DiffOutcome, Granularity};
use tally::store::Store;
use tally::updater::AccountUpdater;
use tally::Error;

fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap()
}

fn followers(n: i64) -> Metrics {
    Metrics { followed_by: n, follows: 40, media: 12, er: 3.2 }
}

fn open(dir: &TempDir) -> Store {
    Store::open(&dir.path().join("tally.db")).unwrap()
}

/// Account with snapshots T0 = 100, T1 = 120, T2 = 150 a month apart.
fn scenario(store: &Store) -> i64 {
    let id = store.insert_account("Entity", at(1, 1)).unwrap();
    store.insert_snapshot(id, &followers(100), at(3, 1)).unwrap();
    store.insert_snapshot(id, &followers(120), at(4, 1)).unwrap();
    store.insert_snapshot(id, &followers(150), at(5, 1)).unwrap();
    id
}

#[test]
fn diff_scenario_against_file_database() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let id = scenario(&store);
    let now = at(6, 1);

    let mut diff = AccountDiff::new(&store, [id], Granularity::Daily).with_now(now);
    diff.init_diff(at(3, 15)).unwrap();
    diff.init_last_diff().unwrap();

    assert_eq!(diff.get_diff(id).unwrap().record().unwrap().delta.followed_by, 50);
    assert_eq!(diff.get_last_diff(id).unwrap().record().unwrap().delta.followed_by, 30);

    let mut daily = AccountDaily::new(&store, [id]);
    daily.init_data(at(4, 1)).unwrap();
    let series: Vec<i64> = daily.series(id).unwrap().iter().map(|s| s.metrics.followed_by).collect();
    assert_eq!(series, vec![120, 150]);
}

#[test]
fn data_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let id = {
        let store = open(&dir);
        scenario(&store)
    };

    let store = open(&dir);
    let mut diff = AccountDiff::new(&store, [id], Granularity::Monthly).with_now(at(6, 1));
    diff.init_last_diff().unwrap();
    assert!(diff.get_last_diff(id).unwrap().is_available());
}

#[test]
fn entity_without_snapshots_never_errors() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let id = store.insert_account("empty", at(1, 1)).unwrap();

    let mut diff = AccountDiff::new(&store, [id], Granularity::Monthly).with_now(at(6, 1));
    diff.init_diff(at(1, 1)).unwrap();
    diff.init_last_diff().unwrap();
    assert_eq!(diff.get_diff(id).unwrap(), DiffOutcome::NoData);
    assert_eq!(diff.get_last_diff(id).unwrap(), DiffOutcome::NoData);

    let mut daily = AccountDaily::new(&store, [id]);
    daily.init_data(at(1, 1)).unwrap();
    assert!(daily.series(id).unwrap().is_empty());
}

#[test]
fn clearing_next_update_commits_with_valid_flag() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let id = store.insert_account("alice", at(1, 1)).unwrap();

    AccountUpdater::new(id)
        .set_invalid()
        .schedule_after(at(2, 1), Duration::days(1))
        .save_at(&store, at(2, 1))
        .unwrap();

    AccountUpdater::new(id)
        .set_is_valid()
        .set_next_stats_update(None)
        .save(&store)
        .unwrap();

    let account = store.find_account(id).unwrap();
    assert_eq!(account.next_stats_update, None);
    assert!(account.is_valid);
    assert_eq!(store.due_accounts(at(2, 1)).unwrap().len(), 1);
}

#[test]
fn settings_flow_and_cascading_delete() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let id = scenario(&store);

    admin::update_note(&mut store, id, 1, "check growth", at(5, 2)).unwrap();
    admin::save_categories(&mut store, id, &["brand".to_string()], 1).unwrap();
    admin::record_media(&mut store, id, "p1", &["launch".to_string()], &["bob".to_string()], at(5, 2))
        .unwrap();

    let account = store.find_account(id).unwrap();
    let form = SettingsForm { disabled: true, ..SettingsForm::from_account(&account) };
    let saved = admin::apply_settings(&store, id, &form, at(5, 3)).unwrap();
    assert!(!saved.monitoring);

    admin::delete_account(&store, id).unwrap();
    assert!(matches!(
        admin::dashboard(&store, id, &Config::default(), at(6, 1)),
        Err(Error::EntityNotFound(_))
    ));
    assert_eq!(store.count_snapshots(id).unwrap(), 0);
    assert_eq!(store.count_media(id).unwrap(), 0);
    // mentioned accounts are kept
    assert!(store.find_account_by_username("bob").unwrap().is_some());
}

#[test]
fn exports_use_declared_columns_and_file_names() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let id = scenario(&store);
    admin::record_media(&mut store, id, "p1", &["a".to_string()], &["Bob".to_string()], at(5, 2))
        .unwrap();

    let today = at(6, 9).date_naive();
    let (account, rows) = admin::all_stats(&store, id).unwrap();
    let export = csv::stats(&account.username, &rows, today);
    assert_eq!(export.filename, "entity_stats_2024-06-09.csv");
    let mut lines = export.contents.lines();
    assert_eq!(lines.next(), Some("followed_by,follows,media,er,created_at"));
    assert_eq!(lines.next(), Some("150,40,12,3.2,2024-05-01 12:00:00"));

    let (_, tags) = admin::media_tags(&store, id).unwrap();
    assert_eq!(csv::media_tags(&account.username, &tags, today).contents, "name,occurs\na,1\n");

    let view = admin::media_accounts(&store, id, 1).unwrap();
    let export = csv::media_accounts(&account.username, &view.mentions, today);
    assert_eq!(export.filename, "entity_media-accounts_2024-06-09.csv");
    assert_eq!(export.contents, "username,occurs\nBob,1\n");

    let written = export.write_to(&dir.path().join("exports")).unwrap();
    assert!(written.exists());
}
