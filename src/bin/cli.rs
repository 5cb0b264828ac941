//! Trend Scheduler CLI
//!
//! Runs the scheduler loop, or a single tick for manual runs and cron jobs.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use trend_scheduler::{
    config,
    error::{AppError, Result},
    models::{Config, PeriodType},
    pipeline::{Collaborators, Orchestrator},
    scheduler::{Clock, Scheduler, SystemClock},
    services::{
        AlarmService, BackendClient, CrawlDriver, DebateService, HttpDriver, KeywordService,
        LogOnlyBackend,
    },
    storage::{LocalRankingStore, RankingStore},
};

/// Trend Scheduler - hourly keyword ranking crawler
#[derive(Parser, Debug)]
#[command(
    name = "trend-scheduler",
    version,
    about = "Hourly trend ranking crawler and aggregator"
)]

struct Cli {
    /// Path to storage directory containing config.toml
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until Ctrl-C
    Run,

    /// Run one hourly tick now
    Tick {
        /// Nominal tick time, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Run one trend tick now
    Trend,

    /// Validate configuration files
    Validate,

    /// Show the published rankings
    Info,
}

/// Initialize logging. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// `--verbose` wins, then `[logging] level`, then `info`.
fn log_level(verbose: bool, config: Option<&Config>) -> &str {
    if verbose {
        "debug"
    } else {
        config.map_or("info", |c| c.logging.level.as_str())
    }
}

fn collaborators<B>(
    driver: Arc<dyn CrawlDriver>,
    store: Arc<dyn RankingStore>,
    backend: Arc<B>,
) -> Collaborators
where
    B: KeywordService + DebateService + AlarmService + 'static,
{
    Collaborators {
        driver,
        store,
        keywords: backend.clone(),
        debates: backend.clone(),
        alarms: backend,
    }
}

fn build_orchestrator(config: &Arc<Config>) -> Result<Orchestrator> {
    let driver: Arc<dyn CrawlDriver> = Arc::new(HttpDriver::new(Arc::clone(config)));
    let store: Arc<dyn RankingStore> = Arc::new(LocalRankingStore::from_config(&config.storage));

    let services = match BackendClient::from_config(&config.backend)? {
        Some(client) => collaborators(driver, store, Arc::new(client)),
        None => {
            log::warn!("No backend.base_url configured; backend calls are only logged");
            collaborators(driver, store, Arc::new(LogOnlyBackend))
        }
    };

    Ok(Orchestrator::new(config, services))
}

fn parse_tick_time(raw: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&offset))
        .map_err(|e| AppError::validation(format!("Invalid --at '{raw}': {e}")))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.storage_dir.join("config.toml");

    let loaded = config::load_validated(&config_path);
    init_logging(log_level(cli.verbose, loaded.as_ref().ok()));

    log::info!("Trend Scheduler starting...");

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return Err(e);
        }
    };
    if config_path.exists() {
        log::info!("Loaded configuration from {}", config_path.display());
    } else {
        log::warn!(
            "No config at {}. Using default configuration.",
            config_path.display()
        );
    }

    let config = Arc::new(config);
    let clock = SystemClock::from_config(&config.scheduler)?;

    match cli.command {
        Command::Run => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let orchestrator =
                Arc::new(build_orchestrator(&config)?.with_shutdown(shutdown_rx.clone()));
            let scheduler = Scheduler::new(orchestrator, &config.scheduler, clock);

            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for Ctrl-C: {e}");
                    return;
                }
                log::info!("Ctrl-C received, shutting down...");
                let _ = shutdown_tx.send(true);
            });

            scheduler.run(shutdown_rx).await;
        }

        Command::Tick { at } => {
            let now = match at {
                Some(raw) => parse_tick_time(&raw, *clock.now().offset())?,
                None => clock.now(),
            };
            build_orchestrator(&config)?.run_hourly_tick(now).await;
        }

        Command::Trend => {
            build_orchestrator(&config)?.run_trend_tick(clock.now()).await;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!(
                "✓ Config OK ({} of {} sources enabled)",
                config.enabled_sources().count(),
                config.sources.len()
            );
            match &config.backend.base_url {
                Some(url) => log::info!("✓ Backend: {url}"),
                None => log::warn!("No backend configured"),
            }
            log::info!("All validations passed!");
        }

        Command::Info => {
            let store = LocalRankingStore::from_config(&config.storage);
            log::info!("Ranking storage: {}", config.storage.root_dir.display());

            for period in PeriodType::ALL {
                match store.load_total(period).await? {
                    Some(ranking) => {
                        log::info!(
                            "{period} ranking generated at {} ({} keywords)",
                            ranking.generated_at,
                            ranking.keywords.len()
                        );
                        for (rank, entry) in ranking.keywords.iter().enumerate() {
                            log::info!("  {:>2}. {} ({})", rank + 1, entry.keyword, entry.score);
                        }
                    }
                    None => log::info!("No {period} ranking published yet."),
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_time_converts_offset() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let at = parse_tick_time("2026-10-19T10:00:00Z", kst).unwrap();
        assert_eq!(at.to_rfc3339(), "2026-10-19T19:00:00+09:00");
    }

    #[test]
    fn test_log_level_precedence() {
        let mut config = Config::default();
        config.logging.level = "warn".into();

        assert_eq!(log_level(true, Some(&config)), "debug");
        assert_eq!(log_level(false, Some(&config)), "warn");
        assert_eq!(log_level(false, None), "info");
    }

    #[test]
    fn test_parse_tick_time_rejects_garbage() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        assert!(matches!(
            parse_tick_time("yesterday", kst),
            Err(AppError::Validation(_))
        ));
    }
}
