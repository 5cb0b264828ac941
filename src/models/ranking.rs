//! Ranking snapshots and merged totals.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{PeriodType, Source};

/// Keywords scraped from one source, in rank order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankingSnapshot {
    pub source: Source,

    /// Top entry first
    pub keywords: Vec<String>,

    pub fetched_at: DateTime<FixedOffset>,
}

/// A keyword with its accumulated score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedKeyword {
    pub keyword: String,
    pub score: u32,
}

/// Merged ranking stored under a period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalRanking {
    pub period: PeriodType,
    pub generated_at: DateTime<FixedOffset>,
    pub keywords: Vec<RankedKeyword>,
}

impl TotalRanking {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Accumulates keyword scores across several ranked lists.
///
/// A keyword at position `i` of a plain list scores `base - i`, so the top
/// entry of every source weighs the same. Already-scored rankings add their
/// scores as they are, which is how hourly totals roll up into days and days
/// into weeks.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    scores: HashMap<String, u32>,
    inputs: usize,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rank-ordered keyword list.
    pub fn add_list(&mut self, keywords: &[String], base: u32) {
        self.inputs += 1;
        for (position, keyword) in keywords.iter().enumerate() {
            let score = base.saturating_sub(position as u32);
            if score == 0 {
                break;
            }
            *self.scores.entry(keyword.clone()).or_insert(0) += score;
        }
    }

    /// Add an already-scored ranking.
    pub fn add_ranking(&mut self, keywords: &[RankedKeyword]) {
        self.inputs += 1;
        for entry in keywords {
            *self.scores.entry(entry.keyword.clone()).or_insert(0) += entry.score;
        }
    }

    /// Number of lists or rankings added so far.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Highest score first, ties broken alphabetically, truncated to `limit`.
    pub fn into_ranked(self, limit: usize) -> Vec<RankedKeyword> {
        let mut ranked: Vec<RankedKeyword> = self
            .scores
            .into_iter()
            .map(|(keyword, score)| RankedKeyword { keyword, score })
            .collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.keyword.cmp(&b.keyword)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_top_entries_score_highest() {
        let mut board = ScoreBoard::new();
        board.add_list(&list(&["태풍", "환율", "야구"]), 10);

        let ranked = board.into_ranked(10);
        assert_eq!(ranked[0].keyword, "태풍");
        assert_eq!(ranked[0].score, 10);
        assert_eq!(ranked[2].score, 8);
    }

    #[test]
    fn test_keywords_shared_across_sources_accumulate() {
        let mut board = ScoreBoard::new();
        board.add_list(&list(&["환율", "태풍"]), 10);
        board.add_list(&list(&["태풍", "주식"]), 10);

        let ranked = board.into_ranked(10);
        assert_eq!(
            ranked[0],
            RankedKeyword {
                keyword: "태풍".into(),
                score: 19
            }
        );
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_entries_past_base_are_ignored() {
        let mut board = ScoreBoard::new();
        board.add_list(&list(&["a", "b", "c", "d"]), 2);

        let ranked = board.into_ranked(10);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_ties_break_alphabetically_and_truncate() {
        let mut board = ScoreBoard::new();
        board.add_ranking(&[
            RankedKeyword {
                keyword: "b".into(),
                score: 5,
            },
            RankedKeyword {
                keyword: "a".into(),
                score: 5,
            },
            RankedKeyword {
                keyword: "c".into(),
                score: 1,
            },
        ]);
        assert_eq!(board.inputs(), 1);

        let ranked = board.into_ranked(2);
        let keywords: Vec<_> = ranked.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["a", "b"]);
    }
}
