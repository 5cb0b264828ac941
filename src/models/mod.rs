// src/models/mod.rs

//! Domain models for the scheduler.

pub mod config;
mod debate;
mod ranking;
mod source;

// Re-export all public types
pub use config::{
    BackendConfig, Config, CrawlerConfig, LoggingConfig, RetryConfig, SchedulerConfig,
    SourceConfig, StorageConfig,
};
pub use debate::{Debate, DebateSet};
pub use ranking::{RankedKeyword, RankingSnapshot, ScoreBoard, TotalRanking};
pub use source::{PeriodType, Source};
