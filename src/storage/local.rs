//! Local filesystem ranking store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── snapshots/{source}.json     # Latest snapshot per source
//! ├── hourly/YYYY-MM-DD/HH.json   # RealTime total of every hourly tick
//! ├── daily/YYYY-MM-DD.json       # Day rollups of the 24h ending at the daily tick
//! ├── weekly/YYYY-MM-DD.json      # Week rollups, keyed by their last day
//! └── total/
//!     ├── realtime.json           # Published rankings
//!     ├── day.json
//!     └── week.json
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeDelta};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{
    PeriodType, RankingSnapshot, ScoreBoard, Source, StorageConfig, TotalRanking,
};
use crate::storage::RankingStore;

const WEEK_DAYS: u64 = 7;
const DAY_HOURS: i64 = 24;

/// Snapshots older than this many hours before the tick are left out of
/// the realtime total.
const SNAPSHOT_MAX_AGE_HOURS: i64 = 1;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalRankingStore {
    root_dir: PathBuf,
    limit: usize,
}

impl LocalRankingStore {
    /// Create a store rooted at `root_dir` keeping `limit` keywords per ranking.
    pub fn new(root_dir: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            root_dir: root_dir.into(),
            limit,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root_dir, config.total_limit)
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn snapshot_key(source: Source) -> String {
        format!("snapshots/{}.json", source.key())
    }

    fn hourly_key(at: &DateTime<FixedOffset>) -> String {
        format!("hourly/{}.json", at.format("%Y-%m-%d/%H"))
    }

    /// Hourly keys of the 24 hours ending at `at`, i.e. `(at - 24h, at]`.
    fn day_window_keys(at: &DateTime<FixedOffset>) -> Vec<String> {
        (0..DAY_HOURS)
            .map(|h| Self::hourly_key(&(*at - TimeDelta::hours(h))))
            .collect()
    }

    fn daily_key(date: NaiveDate) -> String {
        format!("daily/{}.json", date.format("%Y-%m-%d"))
    }

    fn weekly_key(date: NaiveDate) -> String {
        format!("weekly/{}.json", date.format("%Y-%m-%d"))
    }

    fn total_key(period: PeriodType) -> String {
        format!("total/{}.json", period.key())
    }

    /// Merge the latest snapshot of every source, skipping stale ones.
    async fn merge_snapshots(&self, at: DateTime<FixedOffset>) -> Result<TotalRanking> {
        let mut board = ScoreBoard::new();
        for source in Source::ALL {
            let Some(snapshot) = self
                .read_json::<RankingSnapshot>(&Self::snapshot_key(source))
                .await?
            else {
                continue;
            };
            if snapshot.fetched_at < at - TimeDelta::hours(SNAPSHOT_MAX_AGE_HOURS) {
                log::warn!(
                    "Skipping stale snapshot source={} fetched_at={}",
                    source.key(),
                    snapshot.fetched_at
                );
                continue;
            }
            board.add_list(&snapshot.keywords, self.limit as u32);
        }

        if board.inputs() == 0 {
            return Err(AppError::EmptyRanking(PeriodType::RealTime.to_string()));
        }

        Ok(TotalRanking {
            period: PeriodType::RealTime,
            generated_at: at,
            keywords: board.into_ranked(self.limit),
        })
    }

    /// Merge already-scored rankings stored under `keys`.
    async fn merge_totals(
        &self,
        keys: &[String],
        period: PeriodType,
        at: DateTime<FixedOffset>,
    ) -> Result<TotalRanking> {
        let mut board = ScoreBoard::new();
        for key in keys {
            if let Some(ranking) = self.read_json::<TotalRanking>(key).await? {
                board.add_ranking(&ranking.keywords);
            }
        }

        if board.inputs() == 0 {
            return Err(AppError::EmptyRanking(format!(
                "{period} {}",
                at.date_naive()
            )));
        }

        Ok(TotalRanking {
            period,
            generated_at: at,
            keywords: board.into_ranked(self.limit),
        })
    }

    /// Copy the rollup stored at `key` to the published total of `period`.
    async fn publish_rollup(
        &self,
        key: &str,
        period: PeriodType,
        at: DateTime<FixedOffset>,
    ) -> Result<TotalRanking> {
        let ranking: TotalRanking = self.read_json(key).await?.ok_or_else(|| {
            AppError::EmptyRanking(format!("{period} {}", at.date_naive()))
        })?;
        self.write_json(&Self::total_key(period), &ranking).await?;
        Ok(ranking)
    }
}

#[async_trait]
impl RankingStore for LocalRankingStore {
    async fn record_snapshot(&self, snapshot: &RankingSnapshot) -> Result<()> {
        self.write_json(&Self::snapshot_key(snapshot.source), snapshot)
            .await
    }

    async fn save_total_ranking(
        &self,
        period: PeriodType,
        at: DateTime<FixedOffset>,
    ) -> Result<TotalRanking> {
        let ranking = match period {
            PeriodType::RealTime => {
                let ranking = self.merge_snapshots(at).await?;
                self.write_json(&Self::hourly_key(&at), &ranking).await?;
                self.write_json(&Self::total_key(period), &ranking).await?;
                ranking
            }
            PeriodType::Day => {
                self.publish_rollup(&Self::daily_key(at.date_naive()), period, at)
                    .await?
            }
            PeriodType::Week => {
                self.publish_rollup(&Self::weekly_key(at.date_naive()), period, at)
                    .await?
            }
        };

        log::info!(
            "Saved {} ranking: {} keywords",
            period,
            ranking.keywords.len()
        );
        Ok(ranking)
    }

    async fn rollup_day(&self, at: DateTime<FixedOffset>) -> Result<TotalRanking> {
        let date = at.date_naive();
        let hourly = Self::day_window_keys(&at);
        let ranking = self.merge_totals(&hourly, PeriodType::Day, at).await?;

        self.write_json(&Self::daily_key(date), &ranking).await?;
        log::info!("Day rollup {}: merged hourly totals of the last {DAY_HOURS}h", date);
        Ok(ranking)
    }

    async fn rollup_week(&self, at: DateTime<FixedOffset>) -> Result<TotalRanking> {
        let date = at.date_naive();
        let days: Vec<String> = (0..WEEK_DAYS)
            .filter_map(|d| date.checked_sub_days(Days::new(d)))
            .map(Self::daily_key)
            .collect();
        let ranking = self.merge_totals(&days, PeriodType::Week, at).await?;

        self.write_json(&Self::weekly_key(date), &ranking).await?;
        log::info!("Week rollup ending {}", date);
        Ok(ranking)
    }

    async fn load_total(&self, period: PeriodType) -> Result<Option<TotalRanking>> {
        self.read_json(&Self::total_key(period)).await
    }
}
