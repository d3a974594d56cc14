//! CSV export of statistics listings.
//!
//! Columns are written in a fixed order per report and the file name
//! follows `{username}_{report}_{YYYY-MM-DD}.csv`.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{MentionCount, Snapshot, TagCount};
use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvReport {
    Stats,
    MediaTags,
    MediaAccounts,
}

impl CsvReport {
    pub fn slug(self) -> &'static str {
        match self {
            CsvReport::Stats => "stats",
            CsvReport::MediaTags => "media-tags",
            CsvReport::MediaAccounts => "media-accounts",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            CsvReport::Stats => &["followed_by", "follows", "media", "er", "created_at"],
            CsvReport::MediaTags => &["name", "occurs"],
            CsvReport::MediaAccounts => &["username", "occurs"],
        }
    }

    pub fn filename(self, username: &str, date: NaiveDate) -> String {
        format!(
            "{}_{}_{}.csv",
            username.to_lowercase(),
            self.slug(),
            date.format("%Y-%m-%d")
        )
    }
}

/// A rendered export ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub contents: String,
}

impl CsvExport {
    /// Write into `dir` under the export's file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.contents)?;
        Ok(path)
    }
}

fn escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render(report: CsvReport, rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut out = report.columns().join(",");
    out.push('\n');

    for row in rows {
        let fields: Vec<String> = row.iter().map(|v| escape(v)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

pub fn stats(username: &str, snapshots: &[Snapshot], date: NaiveDate) -> CsvExport {
    let rows = snapshots.iter().map(|s| {
        vec![
            s.metrics.followed_by.to_string(),
            s.metrics.follows.to_string(),
            s.metrics.media.to_string(),
            s.metrics.er.to_string(),
            util::format_timestamp(s.created_at),
        ]
    });

    CsvExport {
        filename: CsvReport::Stats.filename(username, date),
        contents: render(CsvReport::Stats, rows),
    }
}

pub fn media_tags(username: &str, tags: &[TagCount], date: NaiveDate) -> CsvExport {
    let rows = tags.iter().map(|t| vec![t.name.clone(), t.occurs.to_string()]);

    CsvExport {
        filename: CsvReport::MediaTags.filename(username, date),
        contents: render(CsvReport::MediaTags, rows),
    }
}

pub fn media_accounts(username: &str, mentions: &[MentionCount], date: NaiveDate) -> CsvExport {
    let rows = mentions
        .iter()
        .map(|m| vec![m.username.clone(), m.occurs.to_string()]);

    CsvExport {
        filename: CsvReport::MediaAccounts.filename(username, date),
        contents: render(CsvReport::MediaAccounts, rows),
    }
}
