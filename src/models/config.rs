//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Source;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Trigger times and period boundaries
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Retry behavior for a single source crawl
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Ranking sites to crawl every hour
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,

    /// Ranking store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Web backend receiving keyword, debate and alarm calls
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Sources that take part in the hourly crawl.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;
        if s.hourly_minute > 59 || s.trend_minute > 59 {
            return Err(AppError::validation(
                "scheduler minutes must be within 0..=59",
            ));
        }
        if s.hourly_minute == s.trend_minute {
            return Err(AppError::validation(
                "scheduler.hourly_minute and scheduler.trend_minute must differ",
            ));
        }
        if s.daily_hour > 23 {
            return Err(AppError::validation("scheduler.daily_hour must be < 24"));
        }
        if s.offset().is_none() {
            return Err(AppError::validation(
                "scheduler.utc_offset_hours must be within -23..=23",
            ));
        }
        if self.retry.max_retries == 0 {
            return Err(AppError::validation("retry.max_retries must be > 0"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_keywords == 0 {
            return Err(AppError::validation("crawler.max_keywords must be > 0"));
        }
        if self.storage.total_limit == 0 {
            return Err(AppError::validation("storage.total_limit must be > 0"));
        }
        if self.enabled_sources().next().is_none() {
            return Err(AppError::validation("No sources enabled"));
        }
        for (i, source) in self.sources.iter().enumerate() {
            if self.sources[..i].iter().any(|s| s.source == source.source) {
                return Err(AppError::validation(format!(
                    "source {} is configured twice",
                    source.source
                )));
            }
            url::Url::parse(&source.url)?;
            if source.item_selector.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "source {} has an empty item_selector",
                    source.source
                )));
            }
        }
        if let Some(base) = &self.backend.base_url {
            url::Url::parse(base)?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            retry: RetryConfig::default(),
            crawler: CrawlerConfig::default(),
            sources: defaults::sources(),
            storage: StorageConfig::default(),
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Trigger times and period boundaries, in the configured local offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Offset of local wall-clock time from UTC (hours)
    #[serde(default = "defaults::utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Minute past the hour the crawl trigger fires
    #[serde(default)]
    pub hourly_minute: u32,

    /// Minute past the hour the trend-debate trigger fires
    #[serde(default = "defaults::trend_minute")]
    pub trend_minute: u32,

    /// Hour whose tick also runs the daily rollup
    #[serde(default = "defaults::daily_hour")]
    pub daily_hour: u32,

    /// Day whose daily tick also runs the weekly rollup
    #[serde(default = "defaults::weekly_day")]
    pub weekly_day: Weekday,
}

impl SchedulerConfig {
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours.checked_mul(3600)?)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: defaults::utc_offset_hours(),
            hourly_minute: 0,
            trend_minute: defaults::trend_minute(),
            daily_hour: defaults::daily_hour(),
            weekly_day: defaults::weekly_day(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per source crawl, including the first
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Fixed wait between attempts in seconds
    #[serde(default = "defaults::retry_delay")]
    pub delay_secs: u64,
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            delay_secs: defaults::retry_delay(),
        }
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Page load timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Keywords kept per source snapshot
    #[serde(default = "defaults::max_keywords")]
    pub max_keywords: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_keywords: defaults::max_keywords(),
        }
    }
}

/// One ranking site and how to read its keyword list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: Source,

    /// Page or feed holding the ranking
    pub url: String,

    /// CSS selector matching one element per ranked keyword
    pub item_selector: String,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding snapshots, rollups and totals
    #[serde(default = "defaults::storage_root")]
    pub root_dir: PathBuf,

    /// Keywords kept in every merged ranking
    #[serde(default = "defaults::total_limit")]
    pub total_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::storage_root(),
            total_limit: defaults::total_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the web backend. Calls are only logged when unset.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "defaults::backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: defaults::backend_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use chrono::Weekday;

    use super::SourceConfig;
    use crate::models::Source;

    // Scheduler defaults
    pub fn utc_offset_hours() -> i32 {
        9
    }
    pub fn trend_minute() -> u32 {
        30
    }
    pub fn daily_hour() -> u32 {
        19
    }
    pub fn weekly_day() -> Weekday {
        Weekday::Mon
    }

    // Retry defaults
    pub fn max_retries() -> u32 {
        5
    }
    pub fn retry_delay() -> u64 {
        5
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; trend-scheduler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_keywords() -> usize {
        10
    }
    pub fn enabled() -> bool {
        true
    }

    // Storage defaults
    pub fn storage_root() -> PathBuf {
        PathBuf::from("storage/rankings")
    }
    pub fn total_limit() -> usize {
        10
    }

    pub fn backend_timeout() -> u64 {
        10
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                source: Source::Naver,
                url: "https://www.signal.bz/".to_string(),
                item_selector: "div.realtime-rank span.rank-text".to_string(),
                enabled: true,
            },
            SourceConfig {
                source: Source::Nate,
                url: "https://m.nate.com/".to_string(),
                item_selector: "ol.kwd_list li a span.txt_rank".to_string(),
                enabled: true,
            },
            SourceConfig {
                source: Source::Zum,
                url: "https://news.zum.com/".to_string(),
                item_selector: "div.issue_keyword li span.keyword".to_string(),
                enabled: true,
            },
            SourceConfig {
                source: Source::Google,
                url: "https://trends.google.co.kr/trending/rss?geo=KR".to_string(),
                item_selector: "item > title".to_string(),
                enabled: true,
            },
            SourceConfig {
                source: Source::Namuwiki,
                url: "https://blog.anteater-lab.link/namu-soup/".to_string(),
                item_selector: "ol.trending li a".to_string(),
                enabled: true,
            },
        ]
    }
}
