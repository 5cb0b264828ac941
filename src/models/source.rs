//! Ranked sites and aggregation periods.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A ranking site polled for trending keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Naver,
    Nate,
    Zum,
    Google,
    Namuwiki,
}

impl Source {
    /// Every source, in crawl order.
    pub const ALL: [Source; 5] = [
        Source::Naver,
        Source::Nate,
        Source::Zum,
        Source::Google,
        Source::Namuwiki,
    ];

    /// Display label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Source::Naver => "Naver",
            Source::Nate => "Nate",
            Source::Zum => "Zum",
            Source::Google => "Google",
            Source::Namuwiki => "Namuwiki",
        }
    }

    /// Lowercase key used for file names and URL paths.
    pub fn key(&self) -> &'static str {
        match self {
            Source::Naver => "naver",
            Source::Nate => "nate",
            Source::Zum => "zum",
            Source::Google => "google",
            Source::Namuwiki => "namuwiki",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregation bucket a ranking belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    #[serde(rename = "realtime")]
    RealTime,
    Day,
    Week,
}

impl PeriodType {
    pub const ALL: [PeriodType; 3] = [PeriodType::RealTime, PeriodType::Day, PeriodType::Week];

    pub fn key(&self) -> &'static str {
        match self {
            PeriodType::RealTime => "realtime",
            PeriodType::Day => "day",
            PeriodType::Week => "week",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
