use chrono::{DateTime, Utc};

/// Format used for timestamps in tables and CSV exports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_optional_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(format_timestamp).unwrap_or_else(|| "-".to_string())
}

/// Convert stored unix seconds back to a UTC timestamp.
pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Compact human-readable count: 999, 1.2K, 3.4M
pub fn format_count(value: i64) -> String {
    let abs = value.unsigned_abs() as f64;
    let sign = if value < 0 { "-" } else { "" };

    if abs >= 1_000_000.0 {
        format!("{sign}{:.1}M", abs / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{sign}{:.1}K", abs / 1_000.0)
    } else {
        value.to_string()
    }
}

/// Signed count with an explicit plus for growth.
pub fn format_delta(delta: i64) -> String {
    if delta > 0 {
        format!("+{}", format_count(delta))
    } else {
        format_count(delta)
    }
}

pub fn format_rate_delta(delta: f64) -> String {
    if delta > 0.0 {
        format!("+{delta:.2}")
    } else {
        format!("{delta:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_stay_exact_below_ten_thousand() {
        assert_eq!(format_count(9_999), "9999");
        assert_eq!(format_count(-42), "-42");
    }

    #[test]
    fn large_counts_are_abbreviated() {
        assert_eq!(format_count(12_500), "12.5K");
        assert_eq!(format_count(3_400_000), "3.4M");
        assert_eq!(format_count(-12_500), "-12.5K");
    }

    #[test]
    fn deltas_carry_sign() {
        assert_eq!(format_delta(30), "+30");
        assert_eq!(format_delta(0), "0");
        assert_eq!(format_delta(-5), "-5");
        assert_eq!(format_rate_delta(0.5), "+0.50");
    }

    #[test]
    fn unix_round_trip_formats_utc() {
        let at = from_unix(86_400).unwrap();
        assert_eq!(format_timestamp(at), "1970-01-02 00:00:00");
        assert_eq!(format_optional_timestamp(None), "-");
    }
}
