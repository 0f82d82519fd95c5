use chrono::Utc;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use beerfest::config::Config;
use beerfest::db::{EntityStore, SqliteEntityStore, StoreError, SyncLog, SyncLogEntry};
use beerfest::feed::{FeedSource, FileFeedSource, HttpFeedSource};
use beerfest::sync::{refresh_due, SyncEngine, SyncError, SyncReport};

const MIN_WATCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Args)]
pub struct SyncCommand {
    /// Only sync when the last successful sync is older than the refresh interval
    #[arg(long)]
    if_stale: bool,

    /// Keep running and sync once per refresh interval
    #[arg(long, conflicts_with = "if_stale")]
    watch: bool,

    /// Import from a local JSON file instead of the configured feed URL
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show when the list was last synced
    Status,
}

#[derive(Debug, Error)]
pub enum SyncCommandError {
    #[error("Sync not configured. Set feed_url in the config file or BEERFEST_FEED_URL.")]
    NotConfigured,
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncCommand {
    pub async fn run(
        &self,
        store: Arc<SqliteEntityStore>,
        config: &Config,
    ) -> Result<(), SyncCommandError> {
        let log = SyncLog::new(store.pool().clone());

        if let Some(SyncSubcommand::Status) = &self.command {
            return status(store.as_ref(), &log, config).await;
        }

        let source: Arc<dyn FeedSource> = match (&self.file, &config.feed_url.value) {
            (Some(path), _) => Arc::new(FileFeedSource::new(path.clone())),
            (None, Some(url)) => Arc::new(HttpFeedSource::new(url.clone())),
            (None, None) => return Err(SyncCommandError::NotConfigured),
        };
        let engine = SyncEngine::new(store, source).with_fetch_timeout(config.fetch_timeout());

        if self.watch {
            return watch(&engine, &log, config.refresh_interval()).await;
        }

        if self.if_stale {
            let last = log.last().await?;
            let last_synced = last.as_ref().map(|entry| entry.synced_at);
            if !refresh_due(last_synced, config.refresh_interval(), Utc::now()) {
                if let Some(entry) = last {
                    println!("Up to date (last synced {}).", entry.synced_at.to_rfc3339());
                }
                return Ok(());
            }
        }

        let report = engine.run().await?;
        log.record(&log_entry(&report)).await?;
        print_report(&report);
        Ok(())
    }
}

async fn status(
    store: &SqliteEntityStore,
    log: &SyncLog,
    config: &Config,
) -> Result<(), SyncCommandError> {
    match &config.feed_url.value {
        Some(url) => println!("Feed:      {}", url),
        None => println!("Feed:      (not configured)"),
    }

    match log.last().await? {
        Some(entry) => {
            println!("Last sync: {}", entry.synced_at.to_rfc3339());
            println!(
                "           {} breweries, {} beers, {} skipped in {} ms",
                entry.breweries_upserted,
                entry.beers_upserted,
                entry.skipped_count,
                entry.elapsed_ms
            );
            let due = refresh_due(Some(entry.synced_at), config.refresh_interval(), Utc::now());
            println!("Refresh:   {}", if due { "due" } else { "not due" });
        }
        None => println!("Last sync: never"),
    }

    println!(
        "Stored:    {} breweries, {} beers",
        store.brewery_count().await?,
        store.count().await?
    );
    Ok(())
}

/// Syncs once per interval until interrupted. Failed runs are reported and
/// retried on the next tick.
async fn watch<S: EntityStore>(
    engine: &SyncEngine<S>,
    log: &SyncLog,
    interval: Duration,
) -> Result<(), SyncCommandError> {
    let mut ticker = tokio::time::interval(interval.max(MIN_WATCH_INTERVAL));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping.");
                return Ok(());
            }
        }

        watch_tick(engine, log).await;
    }
}

/// One scheduled sync. Failures, including a failed log write, are reported
/// and left for the next tick.
async fn watch_tick<S: EntityStore>(engine: &SyncEngine<S>, log: &SyncLog) {
    match engine.run().await {
        Ok(report) => {
            if let Err(e) = log.record(&log_entry(&report)).await {
                tracing::warn!("Failed to record sync: {}", e);
            }
            print_report(&report);
        }
        Err(e) => {
            eprintln!("Sync failed: {}", e.to_failure());
        }
    }
}

fn log_entry(report: &SyncReport) -> SyncLogEntry {
    SyncLogEntry {
        synced_at: Utc::now(),
        breweries_upserted: to_i64(report.breweries_upserted),
        beers_upserted: to_i64(report.beers_upserted),
        skipped_count: to_i64(report.skipped_count),
        elapsed_ms: i64::try_from(report.elapsed.as_millis()).unwrap_or(i64::MAX),
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn print_report(report: &SyncReport) {
    println!(
        "Synced {} breweries and {} beers in {:.1}s",
        report.breweries_upserted,
        report.beers_upserted,
        report.elapsed.as_secs_f64()
    );
    if report.skipped_count > 0 {
        println!("Skipped {} entries:", report.skipped_count);
        for entry in &report.skipped {
            println!("  {}", entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beerfest::db::init_db;
    use beerfest::feed::StaticFeedSource;
    use beerfest::sync::SyncState;
    use tempfile::TempDir;

    const FEED: &str = r#"{"producers": [{"id": "b1", "name": "Milton", "products": [
        {"id": "p1", "name": "Pegasus", "abv": "4.1"}
    ]}]}"#;

    #[tokio::test]
    async fn test_watch_tick_survives_log_failure() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(
            SqliteEntityStore::open(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let engine = SyncEngine::new(Arc::clone(&store), Arc::new(StaticFeedSource::new(FEED)));

        let log_pool = init_db(&temp_dir.path().join("log.db")).await.unwrap();
        log_pool.close().await;
        let log = SyncLog::new(log_pool);

        watch_tick(&engine, &log).await;
        watch_tick(&engine, &log).await;

        assert!(matches!(engine.state(), SyncState::Succeeded(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
