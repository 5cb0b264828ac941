// src/services/backend.rs

//! Web backend collaborators.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{BackendConfig, DebateSet, Source};
use crate::services::{AlarmService, DebateService, KeywordService};

/// REST client for the keyword, debate and alarm endpoints of the backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // `Url::join` drops the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Build from config, or `None` when no backend URL is set.
    pub fn from_config(config: &BackendConfig) -> Result<Option<Self>> {
        config
            .base_url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_secs(config.timeout_secs)))
            .transpose()
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post(&self, context: &str, path: &str) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).send().await?;
        Self::check(context, response)
    }

    fn check(context: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(AppError::backend(context, format!("status {status}")))
        }
    }
}

#[async_trait]
impl KeywordService for BackendClient {
    async fn finalize_daily(&self, source: Source) -> Result<()> {
        let path = format!("scheduler/keywords/{}/daily", source.key());
        self.post(&format!("finalize {source}"), &path).await?;
        Ok(())
    }
}

#[async_trait]
impl DebateService for BackendClient {
    async fn update_hot_debates(&self) -> Result<DebateSet> {
        let response = self.post("hot debates", "scheduler/debates/hot").await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AlarmService for BackendClient {
    async fn create_trend_alarm(&self, debates: &DebateSet) -> Result<()> {
        let url = self.endpoint("scheduler/alarms/trend")?;
        let response = self.client.post(url).json(debates).send().await?;
        Self::check("trend alarm", response)?;
        Ok(())
    }
}

/// Stand-in used when no backend is configured. Only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyBackend;

#[async_trait]
impl KeywordService for LogOnlyBackend {
    async fn finalize_daily(&self, source: Source) -> Result<()> {
        log::info!("[no backend] finalize daily keywords source={}", source.key());
        Ok(())
    }
}

#[async_trait]
impl DebateService for LogOnlyBackend {
    async fn update_hot_debates(&self) -> Result<DebateSet> {
        log::info!("[no backend] hot debate update skipped");
        Ok(DebateSet::default())
    }
}

#[async_trait]
impl AlarmService for LogOnlyBackend {
    async fn create_trend_alarm(&self, debates: &DebateSet) -> Result<()> {
        log::info!("[no backend] trend alarm for {} debates", debates.len());
        Ok(())
    }
}
