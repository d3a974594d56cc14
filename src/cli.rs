use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::util::TIMESTAMP_FORMAT;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Track account statistics and compare them by day and month")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overrides the config file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage tracked accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Record a statistics snapshot
    Record(RecordArgs),

    /// Record a collected post with its tags and mentions
    Media(MediaArgs),

    /// Show daily and monthly changes for an account
    Dashboard(ViewArgs),

    /// List an account's statistics snapshots
    Stats(StatsArgs),

    /// Tags used in an account's media
    MediaTags(ExportArgs),

    /// Accounts mentioned in an account's media
    MediaAccounts(MediaAccountsArgs),

    /// Replace your note on an account
    Note(NoteArgs),

    /// Change monitoring settings
    Settings(SettingsArgs),

    /// Replace your categories on an account
    Categories(CategoriesArgs),

    /// Delete every statistics snapshot of an account
    DeleteStats(IdArgs),

    /// Delete every collected post of an account
    DeleteAssociated(IdArgs),

    /// List accounts whose statistics collection is due
    Due(JsonArgs),

    /// Schedule an account's next collection one interval from now
    MarkUpdated(IdArgs),
}

#[derive(Subcommand)]
pub enum AccountCommand {
    /// Start tracking an account
    Add {
        username: String,
    },

    /// List tracked accounts
    List(JsonArgs),

    /// Show one account
    Show(ViewArgs),

    /// Delete an account with its stats, notes and media
    Delete(IdArgs),
}

#[derive(Args)]
pub struct IdArgs {
    /// Account ID
    pub id: i64,
}

#[derive(Args)]
pub struct JsonArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ViewArgs {
    /// Account ID
    pub id: i64,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct RecordArgs {
    /// Account ID
    pub id: i64,

    #[arg(long)]
    pub followed_by: i64,

    #[arg(long)]
    pub follows: i64,

    #[arg(long)]
    pub media: i64,

    /// Engagement rate
    #[arg(long, default_value_t = 0.0)]
    pub er: f64,

    /// Capture time, "YYYY-MM-DD HH:MM:SS" UTC or RFC 3339 (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args)]
pub struct MediaArgs {
    /// Account ID
    pub id: i64,

    #[arg(long)]
    pub shortcode: String,

    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Mentioned usernames
    #[arg(long, value_delimiter = ',')]
    pub mentions: Vec<String>,

    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Account ID
    pub id: i64,

    /// Page number, starting at 1
    #[arg(long)]
    pub page: Option<u32>,

    /// Rows per page (clamped to the configured range)
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Write every snapshot as CSV into this directory instead of listing
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Account ID
    pub id: i64,

    /// Write CSV into this directory instead of listing
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct MediaAccountsArgs {
    #[command(flatten)]
    pub export: ExportArgs,

    /// Acting user whose categories are shown
    #[arg(long, default_value_t = 1)]
    pub user: i64,
}

#[derive(Args)]
pub struct NoteArgs {
    /// Account ID
    pub id: i64,

    pub text: String,

    /// Acting user
    #[arg(long, default_value_t = 1)]
    pub user: i64,
}

#[derive(Args)]
pub struct SettingsArgs {
    /// Account ID
    pub id: i64,

    #[arg(long)]
    pub disabled: Option<bool>,

    #[arg(long)]
    pub monitoring: Option<bool>,

    #[arg(long)]
    pub valid: Option<bool>,
}

#[derive(Args)]
pub struct CategoriesArgs {
    /// Account ID
    pub id: i64,

    /// Category names; an empty list removes all of yours
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Acting user
    #[arg(long, default_value_t = 1)]
    pub user: i64,
}

/// Accepts "YYYY-MM-DD HH:MM:SS" (UTC), "YYYY-MM-DD" (midnight UTC) or RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Ok(at.and_utc());
    }
    if let Some(at) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(at.and_utc());
    }

    Err(format!("invalid timestamp '{value}', expected YYYY-MM-DD HH:MM:SS"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_accept_common_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-06-01 08:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-01T10:30:00+02:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-06-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_record_command() {
        let cli = Cli::try_parse_from([
            "tally", "record", "3", "--followed-by", "120", "--follows", "5", "--media", "9",
            "--at", "2024-06-01",
        ])
        .unwrap();

        match cli.command {
            Command::Record(args) => {
                assert_eq!(args.id, 3);
                assert_eq!(args.followed_by, 120);
                assert_eq!(args.er, 0.0);
                assert!(args.at.is_some());
            }
            _ => panic!("expected record command"),
        }
    }

    #[test]
    fn categories_split_on_commas() {
        let cli = Cli::try_parse_from(["tally", "categories", "2", "--tags", "food,travel", "--user", "7"])
            .unwrap();

        match cli.command {
            Command::Categories(args) => {
                assert_eq!(args.tags, vec!["food".to_string(), "travel".to_string()]);
                assert_eq!(args.user, 7);
            }
            _ => panic!("expected categories command"),
        }
    }
}
