use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked social-media profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub disabled: bool,
    pub monitoring: bool,
    pub is_valid: bool,
    /// When the external collector should next fetch statistics.
    /// `None` means as soon as possible.
    pub next_stats_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Measured values of one statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub followed_by: i64,
    pub follows: i64,
    pub media: i64,
    /// Engagement rate, fractional.
    pub er: f64,
}

impl Metrics {
    /// Signed change from `earlier` to `self`.
    pub fn delta_since(&self, earlier: &Metrics) -> MetricsDelta {
        MetricsDelta {
            followed_by: self.followed_by.saturating_sub(earlier.followed_by),
            follows: self.follows.saturating_sub(earlier.follows),
            media: self.media.saturating_sub(earlier.media),
            er: self.er - earlier.er,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricsDelta {
    pub followed_by: i64,
    pub follows: i64,
    pub media: i64,
    pub er: f64,
}

impl MetricsDelta {
    pub fn is_zero(&self) -> bool {
        self.followed_by == 0 && self.follows == 0 && self.media == 0 && self.er == 0.0
    }
}

/// One stored measurement of an account (`account_stats` row).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: i64,
    pub account_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: i64,
    pub account_id: i64,
    pub user_id: i64,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// A tag used in an account's media with its number of uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub occurs: i64,
}

/// An account mentioned in another account's media with its number of mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionCount {
    pub account_id: i64,
    pub username: String,
    pub occurs: i64,
}
