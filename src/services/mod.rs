//! Service layer: the collaborators the orchestrator drives.
//!
//! - Crawl driver and session (`CrawlDriver`, `CrawlSession`)
//! - Daily keyword finalization (`KeywordService`)
//! - Hot-debate recomputation (`DebateService`)
//! - Trend alarms (`AlarmService`)
//!
//! `HttpDriver` scrapes the ranking sites directly. `BackendClient` forwards
//! the keyword, debate and alarm calls to the web backend over REST;
//! `LogOnlyBackend` stands in when no backend is configured.

mod backend;
mod driver;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DebateSet, RankingSnapshot, Source};

pub use backend::{BackendClient, LogOnlyBackend};
pub use driver::{HttpDriver, HttpSession};

/// Opens crawl sessions over the underlying browser/HTTP resource.
#[async_trait]
pub trait CrawlDriver: Send + Sync {
    /// Acquire the resource. Failing here ends the tick's crawl phase.
    async fn open(&self) -> Result<Box<dyn CrawlSession>>;
}

/// Exclusive use of the crawl resource for one tick.
#[async_trait]
pub trait CrawlSession: Send + Sync {
    /// Fetch the current ranking of `source` from `url`.
    ///
    /// A driver timeout must surface as `AppError::Timeout` (or a timed-out
    /// HTTP error) so it gets retried.
    async fn fetch(&self, source: Source, url: &str) -> Result<RankingSnapshot>;

    /// Release the resource. Called exactly once per opened session.
    async fn close(&mut self);
}

/// Promotes the day's crawled keywords to daily keywords.
#[async_trait]
pub trait KeywordService: Send + Sync {
    async fn finalize_daily(&self, source: Source) -> Result<()>;
}

#[async_trait]
pub trait DebateService: Send + Sync {
    /// Recompute which debates are hot right now.
    async fn update_hot_debates(&self) -> Result<DebateSet>;
}

#[async_trait]
pub trait AlarmService: Send + Sync {
    /// Raise trend alarms for the given debates.
    async fn create_trend_alarm(&self, debates: &DebateSet) -> Result<()>;
}
