//! Storage abstractions for ranking aggregation.
//!
//! The store keeps the latest snapshot of every source and derives merged
//! rankings from them, one per period:
//!
//! - RealTime: written once per hourly tick from the latest source snapshots
//! - Day: rolled up from the day's hourly totals
//! - Week: rolled up from the last seven day rollups

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::models::{PeriodType, RankingSnapshot, TotalRanking};

// Re-export for convenience
pub use local::LocalRankingStore;

/// Trait for ranking store backends.
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Keep `snapshot` as the latest ranking of its source.
    async fn record_snapshot(&self, snapshot: &RankingSnapshot) -> Result<()>;

    /// Publish the current total ranking of `period`.
    ///
    /// For `RealTime` the total is merged from the latest snapshots and also
    /// kept as the hourly history entry for `at`. `Day` and `Week` publish the
    /// rollup produced for `at`'s date.
    async fn save_total_ranking(
        &self,
        period: PeriodType,
        at: DateTime<FixedOffset>,
    ) -> Result<TotalRanking>;

    /// Merge the hourly totals of `at`'s date into a day ranking.
    async fn rollup_day(&self, at: DateTime<FixedOffset>) -> Result<TotalRanking>;

    /// Merge the seven day rankings ending on `at`'s date into a week ranking.
    async fn rollup_week(&self, at: DateTime<FixedOffset>) -> Result<TotalRanking>;

    /// Load the published total of `period`, if any.
    async fn load_total(&self, period: PeriodType) -> Result<Option<TotalRanking>>;
}
