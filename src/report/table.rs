//! Plain-text tables for terminal output.

use std::collections::BTreeMap;

use crate::admin::{Dashboard, MediaAccounts, StatsPage};
use crate::models::{Account, TagCount};
use crate::stats::{DiffOutcome, DiffRecord};
use crate::util::{format_count, format_delta, format_optional_timestamp, format_rate_delta, format_timestamp};

fn diff_line(label: &str, outcome: &DiffOutcome) -> String {
    match outcome {
        DiffOutcome::NoData => format!("  {label:<16} no data\n"),
        DiffOutcome::Available(record) => format!(
            "  {label:<16} followers {:>8}  follows {:>6}  media {:>5}  er {:>6}  ({} -> {})\n",
            format_delta(record.delta.followed_by),
            format_delta(record.delta.follows),
            format_delta(record.delta.media),
            format_rate_delta(record.delta.er),
            record.period_start.format("%Y-%m-%d"),
            record.period_end.format("%Y-%m-%d"),
        ),
    }
}

fn changes_table(title: &str, changes: &[DiffRecord], date_format: &str) -> String {
    let mut output = format!("\n{title}\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');

    if changes.is_empty() {
        output.push_str("  no changes recorded\n");
        return output;
    }

    // newest first
    for change in changes.iter().rev() {
        output.push_str(&format!(
            "  {:<12} {:>10} {:>8} {:>6} {:>8}\n",
            change.period_end.format(date_format).to_string(),
            format_delta(change.delta.followed_by),
            format_delta(change.delta.follows),
            format_delta(change.delta.media),
            format_rate_delta(change.delta.er),
        ));
    }

    output
}

pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let account = &dashboard.account;
    let mut output = format!("@{} (#{})\n", account.username, account.id);
    output.push_str(&format!(
        "status: {}{}{}\n",
        if account.disabled { "disabled" } else { "enabled" },
        if account.monitoring { ", monitored" } else { "" },
        if account.is_valid { "" } else { ", invalid" },
    ));

    if let Some(latest) = dashboard.daily_stats.last() {
        output.push_str(&format!(
            "followers {}  follows {}  media {}  er {:.2}  (as of {})\n",
            format_count(latest.metrics.followed_by),
            format_count(latest.metrics.follows),
            format_count(latest.metrics.media),
            latest.metrics.er,
            format_timestamp(latest.created_at),
        ));
    }

    output.push_str("\nChanges\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&diff_line("last day", &dashboard.last_daily_change));
    output.push_str(&diff_line("last month", &dashboard.last_monthly_change));
    output.push_str(&diff_line("daily window", &dashboard.daily_diff));
    output.push_str(&diff_line("monthly window", &dashboard.monthly_diff));

    output.push_str(&changes_table("Daily changes", &dashboard.daily_changes, "%Y-%m-%d"));
    output.push_str(&changes_table("Monthly changes", &dashboard.monthly_changes, "%Y-%m"));

    if !dashboard.notes.is_empty() {
        output.push_str("\nNotes\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        for note in &dashboard.notes {
            output.push_str(&format!("  [user {}] {}\n", note.user_id, note.note));
        }
    }

    output
}

pub fn render_accounts(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return String::from("No accounts.\n");
    }

    let mut output = format!(
        "{:<6} {:<24} {:<9} {:<10} {:<6} {:<20}\n",
        "ID", "Username", "Status", "Monitored", "Valid", "Next update"
    );
    output.push_str(&"-".repeat(80));
    output.push('\n');

    for account in accounts {
        output.push_str(&format!(
            "{:<6} {:<24} {:<9} {:<10} {:<6} {:<20}\n",
            account.id,
            truncate(&account.username, 24),
            if account.disabled { "disabled" } else { "enabled" },
            if account.monitoring { "yes" } else { "no" },
            if account.is_valid { "yes" } else { "no" },
            format_optional_timestamp(account.next_stats_update),
        ));
    }

    output
}

pub fn render_stats_page(page: &StatsPage) -> String {
    let mut output = format!(
        "@{} stats, page {} ({} per page, {} total)\n",
        page.account.username, page.page, page.per_page, page.total
    );
    output.push_str(&format!(
        "{:>12} {:>10} {:>8} {:>8}  {:<20}\n",
        "followed_by", "follows", "media", "er", "created_at"
    ));
    output.push_str(&"-".repeat(64));
    output.push('\n');

    for row in &page.rows {
        output.push_str(&format!(
            "{:>12} {:>10} {:>8} {:>8.2}  {:<20}\n",
            row.metrics.followed_by,
            row.metrics.follows,
            row.metrics.media,
            row.metrics.er,
            format_timestamp(row.created_at),
        ));
    }

    output
}

pub fn render_tags(username: &str, tags: &[TagCount]) -> String {
    if tags.is_empty() {
        return format!("No tags in @{username}'s media.\n");
    }

    let mut output = format!("{:30} {:>8}\n", "Tag", "Occurs");
    output.push_str(&"-".repeat(40));
    output.push('\n');
    for tag in tags {
        output.push_str(&format!("{:30} {:>8}\n", truncate(&tag.name, 30), tag.occurs));
    }
    output
}

pub fn render_media_accounts(view: &MediaAccounts) -> String {
    if view.mentions.is_empty() {
        return format!("No accounts mentioned in @{}'s media.\n", view.account.username);
    }

    let mut output = format!("{:24} {:>8}  {}\n", "Username", "Occurs", "Categories");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for mention in &view.mentions {
        output.push_str(&format!(
            "{:24} {:>8}  {}\n",
            truncate(&mention.username, 24),
            mention.occurs,
            categories_cell(&view.categories, mention.account_id),
        ));
    }
    output
}

fn categories_cell(categories: &BTreeMap<i64, Vec<String>>, account_id: i64) -> String {
    categories
        .get(&account_id)
        .map(|names| names.join(", "))
        .unwrap_or_default()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metrics, Snapshot};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
    }

    fn snapshot(id: i64, day: u32, followed_by: i64) -> Snapshot {
        Snapshot {
            id,
            account_id: 1,
            created_at: at(day),
            metrics: Metrics { followed_by, follows: 10, media: 2, er: 1.0 },
        }
    }

    fn account() -> Account {
        Account {
            id: 1,
            username: "alice".to_string(),
            disabled: false,
            monitoring: true,
            is_valid: true,
            next_stats_update: None,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    #[test]
    fn dashboard_shows_no_data_lines() {
        let dashboard = Dashboard {
            account: account(),
            generated_at: at(10),
            last_daily_change: DiffOutcome::NoData,
            last_monthly_change: DiffOutcome::NoData,
            daily_stats: vec![],
            daily_diff: DiffOutcome::NoData,
            daily_changes: vec![],
            monthly_diff: DiffOutcome::NoData,
            monthly_changes: vec![],
            notes: vec![],
        };

        let text = render_dashboard(&dashboard);
        assert!(text.starts_with("@alice (#1)"));
        assert_eq!(text.matches("no data").count(), 4);
        assert!(text.contains("no changes recorded"));
    }

    #[test]
    fn dashboard_shows_signed_deltas() {
        let record = DiffRecord::between(&snapshot(1, 1, 120), &snapshot(2, 2, 150));
        let dashboard = Dashboard {
            account: account(),
            generated_at: at(10),
            last_daily_change: DiffOutcome::Available(record.clone()),
            last_monthly_change: DiffOutcome::NoData,
            daily_stats: vec![snapshot(2, 2, 150)],
            daily_diff: DiffOutcome::Available(record.clone()),
            daily_changes: vec![record],
            monthly_diff: DiffOutcome::NoData,
            monthly_changes: vec![],
            notes: vec![],
        };

        let text = render_dashboard(&dashboard);
        assert!(text.contains("+30"));
        assert!(text.contains("2024-06-01 -> 2024-06-02"));
    }

    #[test]
    fn accounts_table_lists_rows() {
        let text = render_accounts(&[account()]);
        assert!(text.contains("alice"));
        assert_eq!(render_accounts(&[]), "No accounts.\n");
    }

    #[test]
    fn long_names_truncated() {
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
    }
}
