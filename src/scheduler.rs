// src/scheduler.rs

//! Wall-clock trigger loop.
//!
//! Fires the hourly tick at `hourly_minute` past every hour and the trend
//! tick at `trend_minute` past every hour, in the configured UTC offset.
//! Ticks run as their own tasks stamped with their nominal fire time, so a
//! slow tick never delays the next trigger.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeDelta, Timelike, Utc};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::error::{AppError, Result};
use crate::models::SchedulerConfig;
use crate::pipeline::Orchestrator;
use crate::pipeline::retry::shutdown_requested;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System time shifted to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        config
            .offset()
            .map(Self::new)
            .ok_or_else(|| AppError::config("scheduler.utc_offset_hours out of range"))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Hourly,
    Trend,
}

/// Receives the ticks fired by `Scheduler`.
#[async_trait]
pub trait TickHandler: Send + Sync + 'static {
    async fn on_hourly(&self, at: DateTime<FixedOffset>);
    async fn on_trend(&self, at: DateTime<FixedOffset>);
}

#[async_trait]
impl TickHandler for Orchestrator {
    async fn on_hourly(&self, at: DateTime<FixedOffset>) {
        self.run_hourly_tick(at).await;
    }

    async fn on_trend(&self, at: DateTime<FixedOffset>) {
        self.run_trend_tick(at).await;
    }
}

/// First instant strictly after `now` that sits at `minute:00` of some hour.
pub fn next_fire(now: DateTime<FixedOffset>, minute: u32) -> DateTime<FixedOffset> {
    let into_hour = TimeDelta::seconds(i64::from(now.minute() * 60 + now.second()))
        + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    let candidate = now - into_hour + TimeDelta::minutes(i64::from(minute));

    if candidate > now {
        candidate
    } else {
        candidate + TimeDelta::hours(1)
    }
}

pub struct Scheduler<H, C> {
    handler: Arc<H>,
    clock: C,
    hourly_minute: u32,
    trend_minute: u32,
}

impl<H: TickHandler, C: Clock> Scheduler<H, C> {
    pub fn new(handler: Arc<H>, config: &SchedulerConfig, clock: C) -> Self {
        Self {
            handler,
            clock,
            hourly_minute: config.hourly_minute,
            trend_minute: config.trend_minute,
        }
    }

    /// The trigger due next after `now`. Hourly wins a tie.
    pub fn next_trigger(&self, now: DateTime<FixedOffset>) -> (Trigger, DateTime<FixedOffset>) {
        let hourly = next_fire(now, self.hourly_minute);
        let trend = next_fire(now, self.trend_minute);
        if trend < hourly {
            (Trigger::Trend, trend)
        } else {
            (Trigger::Hourly, hourly)
        }
    }

    /// Fire ticks until `shutdown` turns `true`, then wait for running ticks.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();
        let mut last_fired = self.clock.now();

        log::info!(
            "Scheduler started: hourly at :{:02}, trend at :{:02}",
            self.hourly_minute,
            self.trend_minute
        );

        loop {
            let now = self.clock.now();
            let (trigger, at) = self.next_trigger(now.max(last_fired));
            let wait = (at - now).to_std().unwrap_or_default();
            log::debug!("Next {trigger:?} tick at {at}");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
            last_fired = at;

            let handler = Arc::clone(&self.handler);
            match trigger {
                Trigger::Hourly => tasks.spawn(async move { handler.on_hourly(at).await }),
                Trigger::Trend => tasks.spawn(async move { handler.on_trend(at).await }),
            };

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    log::error!("Tick task failed: {e}");
                }
            }
        }

        if !tasks.is_empty() {
            log::info!("Shutdown requested, waiting for {} running tick(s)", tasks.len());
        }
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                log::error!("Tick task failed: {e}");
            }
        }
        log::info!("Scheduler stopped.");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::TimeZone;
    use tokio::time::Instant;

    use super::*;

    fn kst(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, day, hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_next_fire_later_this_hour() {
        assert_eq!(next_fire(kst(20, 13, 10, 5), 30), kst(20, 13, 30, 0));
    }

    #[test]
    fn test_next_fire_rolls_to_next_hour() {
        assert_eq!(next_fire(kst(20, 13, 10, 0), 0), kst(20, 14, 0, 0));
        assert_eq!(next_fire(kst(20, 13, 30, 0), 30), kst(20, 14, 30, 0));
    }

    #[test]
    fn test_next_fire_crosses_midnight() {
        assert_eq!(next_fire(kst(20, 23, 45, 0), 0), kst(21, 0, 0, 0));
    }

    #[test]
    fn test_next_fire_keeps_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = ist.with_ymd_and_hms(2026, 10, 20, 9, 50, 0).unwrap();
        assert_eq!(
            next_fire(now, 0),
            ist.with_ymd_and_hms(2026, 10, 20, 10, 0, 0).unwrap()
        );
    }

    /// Wall clock driven by tokio's (pausable) time.
    struct TokioClock {
        wall: DateTime<FixedOffset>,
        started: Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<FixedOffset> {
            let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap();
            self.wall + elapsed
        }
    }

    #[derive(Default)]
    struct Recorder {
        fired: Mutex<Vec<(Trigger, DateTime<FixedOffset>)>>,
    }

    #[async_trait]
    impl TickHandler for Recorder {
        async fn on_hourly(&self, at: DateTime<FixedOffset>) {
            self.fired.lock().unwrap().push((Trigger::Hourly, at));
        }

        async fn on_trend(&self, at: DateTime<FixedOffset>) {
            self.fired.lock().unwrap().push((Trigger::Trend, at));
        }
    }

    fn scheduler(recorder: Arc<Recorder>, start: DateTime<FixedOffset>) -> Scheduler<Recorder, TokioClock> {
        let clock = TokioClock {
            wall: start,
            started: Instant::now(),
        };
        Scheduler::new(recorder, &SchedulerConfig::default(), clock)
    }

    #[test]
    fn test_next_trigger_picks_earliest() {
        let s = scheduler(Arc::new(Recorder::default()), kst(20, 13, 0, 0));
        assert_eq!(s.next_trigger(kst(20, 13, 10, 0)), (Trigger::Trend, kst(20, 13, 30, 0)));
        assert_eq!(s.next_trigger(kst(20, 13, 40, 0)), (Trigger::Hourly, kst(20, 14, 0, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fires_ticks_at_nominal_times() {
        let recorder = Arc::new(Recorder::default());
        let s = Arc::new(scheduler(Arc::clone(&recorder), kst(20, 13, 50, 0)));
        let (tx, rx) = watch::channel(false);

        let running = {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.run(rx).await })
        };

        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        tx.send(true).unwrap();
        running.await.unwrap();

        let fired = recorder.fired.lock().unwrap().clone();
        assert_eq!(
            fired,
            vec![
                (Trigger::Hourly, kst(20, 14, 0, 0)),
                (Trigger::Trend, kst(20, 14, 30, 0)),
                (Trigger::Hourly, kst(20, 15, 0, 0)),
                (Trigger::Trend, kst(20, 15, 30, 0)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_immediately_on_shutdown() {
        let recorder = Arc::new(Recorder::default());
        let s = scheduler(Arc::clone(&recorder), kst(20, 13, 50, 0));
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let start = Instant::now();
        s.run(rx).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(recorder.fired.lock().unwrap().is_empty());
    }
}
