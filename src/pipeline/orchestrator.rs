// src/pipeline/orchestrator.rs

//! Tick orchestration.
//!
//! One hourly tick crawls every enabled source inside a single crawl session
//! and publishes the realtime ranking. The 19:00 tick then rolls the day up
//! and finalizes the day's keywords; on Mondays it also rolls the week up.
//! The half-past tick recomputes hot debates and raises trend alarms.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::{Mutex, watch};

use crate::error::Result;
use crate::models::{Config, PeriodType, Source, SourceConfig};
use crate::services::{AlarmService, CrawlDriver, CrawlSession, DebateService, KeywordService};
use crate::storage::RankingStore;

use super::retry::{RetryExecutor, RetryPolicy};
use super::window::{TickPlan, TimeWindow};

/// External collaborators injected at start-up.
#[derive(Clone)]
pub struct Collaborators {
    pub driver: Arc<dyn CrawlDriver>,
    pub store: Arc<dyn RankingStore>,
    pub keywords: Arc<dyn KeywordService>,
    pub debates: Arc<dyn DebateService>,
    pub alarms: Arc<dyn AlarmService>,
}

/// Per-tick crawl results.
#[derive(Debug, Default)]
struct CrawlSummary {
    succeeded: Vec<Source>,
    failed: Vec<Source>,
}

/// Drives hourly and half-hourly ticks.
pub struct Orchestrator {
    sources: Vec<SourceConfig>,
    window: TimeWindow,
    retry: RetryExecutor,
    services: Collaborators,
    /// Held for the whole crawl path of a tick
    crawl_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: &Config, services: Collaborators) -> Self {
        Self {
            sources: config.enabled_sources().cloned().collect(),
            window: TimeWindow::from(&config.scheduler),
            retry: RetryExecutor::new(RetryPolicy::from(&config.retry)),
            services,
            crawl_lock: Mutex::new(()),
        }
    }

    /// Cut retry waits short once `shutdown` turns `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.retry = self.retry.with_shutdown(shutdown);
        self
    }

    /// Run one hourly tick stamped `now`.
    ///
    /// Never fails: every error is logged. A tick that fires while the
    /// previous one is still crawling is skipped.
    pub async fn run_hourly_tick(&self, now: DateTime<FixedOffset>) {
        let Ok(_guard) = self.crawl_lock.try_lock() else {
            log::warn!("Previous tick still running, skipping tick at {now}");
            return;
        };

        let plan = self.window.plan(&now);
        log::info!("Starting scheduled tasks at {now} plan={plan:?}");

        let run = AssertUnwindSafe(self.run_plan(plan, now)).catch_unwind().await;
        if let Err(panic) = run {
            log::error!("Scheduled tasks aborted: {}", panic_message(panic.as_ref()));
        }

        log::info!("Scheduled tasks completed.");
    }

    /// Run one half-past tick: recompute hot debates and raise trend alarms.
    pub async fn run_trend_tick(&self, now: DateTime<FixedOffset>) {
        log::info!("Updating trend debates at {now}");

        let debates = match self.services.debates.update_hot_debates().await {
            Ok(debates) => debates,
            Err(e) => {
                log::error!("Hot debate update failed: {e}");
                return;
            }
        };

        match self.services.alarms.create_trend_alarm(&debates).await {
            Ok(()) => log::info!("Trend alarm raised for {} debates", debates.len()),
            Err(e) => log::error!("Trend alarm failed: {e}"),
        }
    }

    async fn run_plan(&self, plan: TickPlan, now: DateTime<FixedOffset>) {
        if !plan.runs_daily() {
            self.perform_hourly_tasks(now).await;
            return;
        }

        self.perform_daily_tasks(now).await;
        if plan.runs_weekly() {
            self.perform_weekly_tasks(now).await;
        }
    }

    /// Crawl all sources inside one session and publish the realtime ranking.
    async fn perform_hourly_tasks(&self, now: DateTime<FixedOffset>) {
        let mut session = match self.services.driver.open().await {
            Ok(session) => session,
            Err(e) => {
                log::error!("Error during hourly task: could not open crawl session: {e}");
                return;
            }
        };

        let outcome = AssertUnwindSafe(self.crawl_sources(session.as_ref(), now))
            .catch_unwind()
            .await;
        session.close().await;

        match outcome {
            Ok(Ok(summary)) => {
                log::info!(
                    "Hourly task done: {}/{} sources succeeded",
                    summary.succeeded.len(),
                    summary.succeeded.len() + summary.failed.len()
                );
                if !summary.failed.is_empty() {
                    log::warn!("Sources without fresh data: {:?}", summary.failed);
                }
            }
            Ok(Err(e)) => log::error!("Error during hourly task: {e}"),
            Err(panic) => {
                log::error!("Hourly task panicked: {}", panic_message(panic.as_ref()))
            }
        }
    }

    async fn crawl_sources(
        &self,
        session: &dyn CrawlSession,
        now: DateTime<FixedOffset>,
    ) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();

        for config in &self.sources {
            let source = config.source;
            let url = config.url.as_str();
            let label = format!("{} crawl", source.label());

            let Some(snapshot) = self
                .retry
                .run(&label, move || session.fetch(source, url))
                .await
            else {
                summary.failed.push(source);
                continue;
            };

            match self.services.store.record_snapshot(&snapshot).await {
                Ok(()) => summary.succeeded.push(source),
                Err(e) => {
                    log::error!("{label}: failed to record snapshot: {e}");
                    summary.failed.push(source);
                }
            }
        }

        self.services
            .store
            .save_total_ranking(PeriodType::RealTime, now)
            .await?;

        Ok(summary)
    }

    async fn perform_daily_tasks(&self, now: DateTime<FixedOffset>) {
        log::info!("Starting daily task...");
        self.perform_hourly_tasks(now).await;

        let store = &self.services.store;
        match store.rollup_day(now).await {
            Ok(_) => {
                if let Err(e) = store.save_total_ranking(PeriodType::Day, now).await {
                    log::error!("Saving day ranking failed: {e}");
                }
            }
            Err(e) => log::error!("Day rollup failed: {e}"),
        }

        self.finalize_daily_keywords().await;
        log::info!("Daily task completed.");
    }

    /// Finalize every source independently; one failure does not stop the rest.
    /// Covers every source, enabled for crawling or not.
    async fn finalize_daily_keywords(&self) {
        let keywords = &self.services.keywords;
        let results = join_all(Source::ALL.into_iter().map(|source| async move {
            (source, keywords.finalize_daily(source).await)
        }))
        .await;

        for (source, result) in results {
            if let Err(e) = result {
                log::error!("Daily keyword finalization failed source={}: {e}", source.key());
            }
        }
    }

    async fn perform_weekly_tasks(&self, now: DateTime<FixedOffset>) {
        log::info!("Starting weekly task...");

        let store = &self.services.store;
        match store.rollup_week(now).await {
            Ok(_) => {
                if let Err(e) = store.save_total_ranking(PeriodType::Week, now).await {
                    log::error!("Saving week ranking failed: {e}");
                }
            }
            Err(e) => log::error!("Week rollup failed: {e}"),
        }

        log::info!("Weekly task completed.");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
