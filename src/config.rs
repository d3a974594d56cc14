//! Runtime configuration.
//!
//! Loaded from `config.toml` in the platform config directory
//! (~/.config/tally/config.toml on Linux) or from `--config`. Every field
//! is optional; a missing default file means defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::store;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database file; defaults to the platform data directory.
    pub database: Option<PathBuf>,
    /// Filter directive used when RUST_LOG is not set.
    pub log_level: String,
    /// Dashboard daily comparisons reach this many months back.
    pub daily_lookback_months: u32,
    /// Dashboard monthly comparisons reach this many months back.
    pub monthly_lookback_months: u32,
    /// Gap between statistics collections, e.g. "1day" or "12h".
    pub stats_update_interval: String,
    pub pagination: PaginationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: None,
            log_level: "warn".to_string(),
            daily_lookback_months: 1,
            monthly_lookback_months: 12,
            stats_update_interval: "1day".to_string(),
            pagination: PaginationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub min_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_page_size: 50,
            min_page_size: 1,
            max_page_size: 1000,
        }
    }
}

impl PaginationConfig {
    /// Resolve a 1-based page request, clamping the size into range.
    pub fn page(&self, number: Option<u32>, size: Option<u32>) -> Page {
        Page {
            number: number.unwrap_or(1).max(1),
            size: size
                .unwrap_or(self.default_page_size)
                .clamp(self.min_page_size, self.max_page_size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

/// Default config file path (~/.config/tally/config.toml or platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tally").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Load from an explicit path (must exist) or the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Config::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.daily_lookback_months == 0 || self.monthly_lookback_months == 0 {
            return Err(Error::Config("lookback months must be at least 1".to_string()));
        }

        let p = &self.pagination;
        if p.min_page_size == 0 || p.min_page_size > p.max_page_size {
            return Err(Error::Config(format!(
                "invalid page size range {}..={}",
                p.min_page_size, p.max_page_size
            )));
        }
        if !(p.min_page_size..=p.max_page_size).contains(&p.default_page_size) {
            return Err(Error::Config(format!(
                "default page size {} outside {}..={}",
                p.default_page_size, p.min_page_size, p.max_page_size
            )));
        }

        self.stats_update_interval()?;
        Ok(())
    }

    pub fn stats_update_interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.stats_update_interval).map_err(|e| {
            Error::Config(format!(
                "invalid stats_update_interval '{}': {e}",
                self.stats_update_interval
            ))
        })
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => store::default_db_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pagination.default_page_size, 50);
        assert_eq!(config.stats_update_interval().unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::from_toml(
            r#"
            database = "/tmp/tally-test.db"
            daily_lookback_months = 2
            stats_update_interval = "12h"

            [pagination]
            default_page_size = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.database, Some(PathBuf::from("/tmp/tally-test.db")));
        assert_eq!(config.daily_lookback_months, 2);
        assert_eq!(config.monthly_lookback_months, 12);
        assert_eq!(config.stats_update_interval().unwrap(), Duration::from_secs(43_200));
        assert_eq!(config.pagination.default_page_size, 20);
        assert_eq!(config.pagination.max_page_size, 1000);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(matches!(Config::from_toml("colour = true"), Err(Error::Config(_))));
    }

    #[test]
    fn bad_interval_rejected() {
        let result = Config::from_toml(r#"stats_update_interval = "soon""#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn zero_lookback_rejected() {
        assert!(Config::from_toml("monthly_lookback_months = 0").is_err());
    }

    #[test]
    fn page_size_is_clamped() {
        let pagination = PaginationConfig::default();
        assert_eq!(pagination.page(None, None), Page { number: 1, size: 50 });
        assert_eq!(pagination.page(Some(0), Some(5000)).size, 1000);
        assert_eq!(pagination.page(Some(3), Some(0)), Page { number: 3, size: 1 });
        assert_eq!(pagination.page(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
