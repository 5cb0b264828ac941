//! Bounded retry with a fixed backoff.
//!
//! A crawl attempt either yields a value, times out in the driver, or fails
//! for any other reason. Only timeouts are retried. Everything ends in an
//! `Option`: the caller never sees the error, so the next independent source
//! can still be crawled.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{AppError, ErrorKind, Result};
use crate::models::RetryConfig;

/// How often and how long to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_retries: u32,
    /// Wait between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub const MAX_RETRIES: u32 = 5;
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::MAX_RETRIES,
            delay: Self::RETRY_DELAY,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.delay(),
        }
    }
}

/// Outcome of one attempt, as seen by the retry loop.
#[derive(Debug)]
pub enum Attempt<T> {
    Ok(T),
    TransientTimeout(AppError),
    Fatal(AppError),
}

impl<T> From<Result<T>> for Attempt<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Attempt::Ok(value),
            Err(e) => match e.kind() {
                ErrorKind::TransientTimeout => Attempt::TransientTimeout(e),
                ErrorKind::Fatal => Attempt::Fatal(e),
            },
        }
    }
}

/// Runs a single unit of work with bounded retries.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    shutdown: Option<watch::Receiver<bool>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            shutdown: None,
        }
    }

    /// Abort pending waits once `shutdown` turns `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `action` until it succeeds, fails for good, or runs out of attempts.
    pub async fn run<T, F, Fut>(&self, label: &str, mut action: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max = self.policy.max_retries;

        for attempt in 1..=max {
            match Attempt::from(action().await) {
                Attempt::Ok(value) => {
                    if attempt > 1 {
                        log::info!("{label}: succeeded on attempt {attempt}/{max}");
                    }
                    return Some(value);
                }
                Attempt::TransientTimeout(e) => {
                    log::warn!("{label}: timeout, retrying... attempt={attempt}/{max} error={e}");
                    if attempt == max {
                        log::error!("{label}: all {max} attempts failed, giving up");
                        return None;
                    }
                    if !self.wait().await {
                        log::error!("{label}: interrupted while waiting to retry, aborting");
                        return None;
                    }
                }
                Attempt::Fatal(e) => {
                    log::error!("{label}: unexpected error, not retrying: {e}");
                    return None;
                }
            }
        }

        None
    }

    /// Sleep for the backoff delay. Returns `false` if shutdown cut it short.
    async fn wait(&self) -> bool {
        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(self.policy.delay).await;
            return true;
        };

        let mut shutdown = shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(self.policy.delay) => true,
            _ = shutdown_requested(&mut shutdown) => false,
        }
    }
}

/// Resolves once the flag is `true`. Never resolves if the sender is gone.
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn timeout() -> AppError {
        AppError::timeout("test", "page load timed out")
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_timeout_exhausts_attempts() {
        let executor = RetryExecutor::default();
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let start = Instant::now();

        let result: Option<()> = executor
            .run("always-timeout", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout())
            })
            .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // four waits between five attempts, none after the last
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_aborts_immediately() {
        let executor = RetryExecutor::default();
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let start = Instant::now();

        let result: Option<()> = executor
            .run("fatal", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::crawl("fatal", "selector matched nothing"))
            })
            .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_timeouts() {
        let executor = RetryExecutor::default();
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let start = Instant::now();

        let result = executor
            .run("flaky", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(timeout()) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Some(3));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_has_no_delay() {
        let executor = RetryExecutor::default();
        let start = Instant::now();

        let result = executor.run("ok", || async { Ok("snapshot") }).await;

        assert_eq!(result, Some("snapshot"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_wait_aborts() {
        let (tx, rx) = watch::channel(false);
        let executor = RetryExecutor::default().with_shutdown(rx);
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let _ = tx.send(true);
            // keep the sender alive past the wait
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let result: Option<()> = executor
            .run("interrupted", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout())
            })
            .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_shutdown_sender_does_not_abort() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let executor = RetryExecutor::new(RetryPolicy {
            max_retries: 3,
            delay: Duration::from_secs(1),
        })
        .with_shutdown(rx);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Option<()> = executor
            .run("no-shutdown", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout())
            })
            .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetryConfig {
            max_retries: 2,
            delay_secs: 7,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay, Duration::from_secs(7));
    }
}
