// src/services/driver.rs

//! HTTP crawl driver.
//!
//! Each session owns one `reqwest::Client`. Rankings are read out of the
//! fetched page with the source's configured CSS selector.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, RankingSnapshot, Source};
use crate::services::{CrawlDriver, CrawlSession};

/// Leading rank markers such as `1`, `02.` or `3)`.
static RANK_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}\s*[.)]?\s+").expect("valid rank prefix pattern"));

/// Opens `HttpSession`s configured from `Config`.
pub struct HttpDriver {
    config: Arc<Config>,
}

impl HttpDriver {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CrawlDriver for HttpDriver {
    async fn open(&self) -> Result<Box<dyn CrawlSession>> {
        let offset = self
            .config
            .scheduler
            .offset()
            .ok_or_else(|| AppError::config("scheduler.utc_offset_hours out of range"))?;

        let client = Client::builder()
            .user_agent(&self.config.crawler.user_agent)
            .timeout(Duration::from_secs(self.config.crawler.timeout_secs))
            .build()
            .map_err(AppError::session)?;

        let selectors = self
            .config
            .enabled_sources()
            .map(|s| (s.source, s.item_selector.clone()))
            .collect();

        log::debug!("Crawl session opened");
        Ok(Box::new(HttpSession {
            client: Some(client),
            selectors,
            max_keywords: self.config.crawler.max_keywords,
            offset,
        }))
    }
}

/// One tick's worth of HTTP crawling.
pub struct HttpSession {
    client: Option<Client>,
    selectors: HashMap<Source, String>,
    max_keywords: usize,
    offset: FixedOffset,
}

impl HttpSession {
    async fn fetch_page(&self, source: Source, url: &str) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::session("session already closed"))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(source, e))?
            .error_for_status()?;

        response.text().await.map_err(|e| Self::classify(source, e))
    }

    fn classify(source: Source, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::timeout(source.label(), error)
        } else {
            AppError::Http(error)
        }
    }
}

#[async_trait]
impl CrawlSession for HttpSession {
    async fn fetch(&self, source: Source, url: &str) -> Result<RankingSnapshot> {
        let selector = self.selectors.get(&source).ok_or_else(|| {
            AppError::crawl(source.label(), "no item selector configured")
        })?;

        let body = self.fetch_page(source, url).await?;
        let keywords = extract_keywords(&body, selector, self.max_keywords)?;

        if keywords.is_empty() {
            return Err(AppError::crawl(
                source.label(),
                format!("selector '{selector}' matched no keywords at {url}"),
            ));
        }

        log::debug!("{}: {} keywords from {}", source, keywords.len(), url);
        Ok(RankingSnapshot {
            source,
            keywords,
            fetched_at: Utc::now().with_timezone(&self.offset),
        })
    }

    async fn close(&mut self) {
        // Dropping the client closes its pooled connections.
        if self.client.take().is_some() {
            log::debug!("Crawl session closed");
        }
    }
}

/// Pull ranked keywords out of an HTML page or RSS feed.
///
/// Text is whitespace-normalized, rank markers are stripped, duplicates keep
/// their first position, and at most `limit` keywords are returned.
pub fn extract_keywords(body: &str, selector: &str, limit: usize) -> Result<Vec<String>> {
    let item_sel = parse_selector(selector)?;
    let document = Html::parse_document(body);

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for element in document.select(&item_sel) {
        let raw: String = element.text().collect();
        let keyword = clean_keyword(&raw);
        if keyword.is_empty() || !seen.insert(keyword.clone()) {
            continue;
        }
        keywords.push(keyword);
        if keywords.len() == limit {
            break;
        }
    }

    Ok(keywords)
}

fn clean_keyword(raw: &str) -> String {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    RANK_PREFIX.replace(&normalized, "").trim().to_string()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNAL_PAGE: &str = r#"
        <html><body>
          <div class="realtime-rank">
            <a><span class="rank-num">1</span><span class="rank-text">태풍 경로</span></a>
            <a><span class="rank-num">2</span><span class="rank-text">  환율
                </span></a>
            <a><span class="rank-num">3</span><span class="rank-text">태풍 경로</span></a>
            <a><span class="rank-num">4</span><span class="rank-text"></span></a>
            <a><span class="rank-num">5</span><span class="rank-text">야구</span></a>
          </div>
        </body></html>
    "#;

    const TRENDS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0"><channel>
          <title>Daily Search Trends</title>
          <item><title>손흥민</title><ht:approx_traffic>1000+</ht:approx_traffic></item>
          <item><title>날씨</title></item>
        </channel></rss>
    "#;

    #[test]
    fn test_extract_keywords_dedups_and_skips_empty() {
        let keywords = extract_keywords(SIGNAL_PAGE, "div.realtime-rank span.rank-text", 10).unwrap();
        assert_eq!(keywords, vec!["태풍 경로", "환율", "야구"]);
    }

    #[test]
    fn test_extract_keywords_respects_limit() {
        let keywords = extract_keywords(SIGNAL_PAGE, "div.realtime-rank span.rank-text", 2).unwrap();
        assert_eq!(keywords.len(), 2);
    }

    #[test]
    fn test_extract_keywords_from_rss_items() {
        let keywords = extract_keywords(TRENDS_FEED, "item > title", 10).unwrap();
        assert_eq!(keywords, vec!["손흥민", "날씨"]);
    }

    #[test]
    fn test_clean_keyword_strips_rank_markers() {
        assert_eq!(clean_keyword("1 태풍"), "태풍");
        assert_eq!(clean_keyword("10. 환율  급등"), "환율 급등");
        assert_eq!(clean_keyword("3) 야구"), "야구");
        assert_eq!(clean_keyword("2024 올림픽"), "2024 올림픽");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            extract_keywords("<p></p>", "[[invalid", 10),
            Err(AppError::Selector { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_session_refuses_fetch() {
        let driver = HttpDriver::new(Arc::new(Config::default()));
        let mut session = driver.open().await.unwrap();
        session.close().await;

        let err = session
            .fetch(Source::Naver, "https://www.signal.bz/")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Session(_)));
    }
}
