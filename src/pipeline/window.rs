//! Decides which task sets a tick runs.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};

use crate::models::SchedulerConfig;

/// Task sets selected for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPlan {
    Hourly,
    /// Hourly, then the daily rollup
    Daily,
    /// Hourly, daily, then the weekly rollup
    DailyAndWeekly,
}

impl TickPlan {
    pub fn runs_daily(&self) -> bool {
        matches!(self, TickPlan::Daily | TickPlan::DailyAndWeekly)
    }

    pub fn runs_weekly(&self) -> bool {
        matches!(self, TickPlan::DailyAndWeekly)
    }
}

/// Period boundaries in local wall-clock time.
///
/// The daily match is exact to the minute: a tick stamped 19:01 takes the
/// hourly path. The scheduler stamps ticks with their nominal fire time, so
/// a late wake-up still lands on 19:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    daily_hour: u32,
    weekly_day: Weekday,
}

impl TimeWindow {
    pub fn new(daily_hour: u32, weekly_day: Weekday) -> Self {
        Self {
            daily_hour,
            weekly_day,
        }
    }

    pub fn should_run_daily(&self, now: &DateTime<FixedOffset>) -> bool {
        now.hour() == self.daily_hour && now.minute() == 0
    }

    pub fn is_weekly_boundary(&self, now: &DateTime<FixedOffset>) -> bool {
        now.weekday() == self.weekly_day
    }

    pub fn plan(&self, now: &DateTime<FixedOffset>) -> TickPlan {
        if !self.should_run_daily(now) {
            TickPlan::Hourly
        } else if self.is_weekly_boundary(now) {
            TickPlan::DailyAndWeekly
        } else {
            TickPlan::Daily
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(19, Weekday::Mon)
    }
}

impl From<&SchedulerConfig> for TimeWindow {
    fn from(config: &SchedulerConfig) -> Self {
        Self::new(config.daily_hour, config.weekly_day)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn kst(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        // 2026-10-19 is a Monday
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, day, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_every_other_hour_is_hourly() {
        let window = TimeWindow::default();
        for hour in (0..24).filter(|h| *h != 19) {
            assert_eq!(window.plan(&kst(19, hour, 0)), TickPlan::Hourly);
            assert_eq!(window.plan(&kst(20, hour, 0)), TickPlan::Hourly);
        }
    }

    #[test]
    fn test_daily_on_non_monday() {
        let window = TimeWindow::default();
        let plan = window.plan(&kst(20, 19, 0));
        assert_eq!(plan, TickPlan::Daily);
        assert!(plan.runs_daily());
        assert!(!plan.runs_weekly());
    }

    #[test]
    fn test_daily_and_weekly_on_monday() {
        let window = TimeWindow::default();
        let plan = window.plan(&kst(19, 19, 0));
        assert_eq!(plan, TickPlan::DailyAndWeekly);
        assert!(plan.runs_daily() && plan.runs_weekly());
    }

    #[test]
    fn test_late_tick_falls_back_to_hourly() {
        let window = TimeWindow::default();
        assert!(!window.should_run_daily(&kst(19, 19, 1)));
        assert_eq!(window.plan(&kst(19, 19, 1)), TickPlan::Hourly);
    }

    #[test]
    fn test_weekly_boundary_is_whole_day() {
        let window = TimeWindow::default();
        assert!(window.is_weekly_boundary(&kst(19, 3, 17)));
        assert!(!window.is_weekly_boundary(&kst(20, 19, 0)));
    }

    #[test]
    fn test_uses_local_offset() {
        let window = TimeWindow::default();
        // 10:00 UTC is 19:00 KST
        let utc_ten = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 20, 10, 0, 0)
            .unwrap();
        let local = utc_ten.with_timezone(&FixedOffset::east_opt(9 * 3600).unwrap());
        assert!(!window.should_run_daily(&utc_ten));
        assert!(window.should_run_daily(&local));
    }

    #[test]
    fn test_from_config() {
        let config = SchedulerConfig {
            daily_hour: 18,
            weekly_day: Weekday::Sun,
            ..SchedulerConfig::default()
        };
        let window = TimeWindow::from(&config);
        // 2026-10-25 is a Sunday
        assert_eq!(window.plan(&kst(25, 18, 0)), TickPlan::DailyAndWeekly);
    }
}
