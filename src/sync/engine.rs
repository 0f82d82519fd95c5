use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex};

use super::error::{SyncError, SyncFailure};
use crate::db::{BeerUpsert, EntityStore};
use crate::feed::{self, FeedSource, FetchError, ParsedFeed, SkippedEntry};

/// Fetch timeout used when the caller does not configure one.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a sync currently is. Terminal states carry the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Idle,
    Fetching,
    Parsing,
    Reconciling,
    Succeeded(SyncReport),
    Failed(SyncFailure),
}

impl SyncState {
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            SyncState::Fetching | SyncState::Parsing | SyncState::Reconciling
        )
    }
}

/// Transitions buffered per subscriber. One run makes at most four.
const TRANSITION_BUFFER: usize = 16;

/// Outcome of a successful sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Distinct brewery ids upserted. A producer repeated in the feed counts
    /// once.
    pub breweries_upserted: usize,
    /// Distinct beer ids upserted. A product repeated in the feed counts once.
    pub beers_upserted: usize,
    pub skipped_count: usize,
    /// Entries dropped during parsing, in feed order.
    pub skipped: Vec<SkippedEntry>,
    pub elapsed: Duration,
}

/// Runs fetch, parse and reconcile against an [`EntityStore`].
///
/// Only one sync runs at a time per engine; a second request while one is in
/// flight is rejected with [`SyncError::AlreadyInProgress`] rather than
/// queued.
pub struct SyncEngine<S: EntityStore> {
    store: Arc<S>,
    source: Arc<dyn FeedSource>,
    fetch_timeout: Duration,
    in_flight: Mutex<()>,
    state: watch::Sender<SyncState>,
    transitions: broadcast::Sender<SyncState>,
}

impl<S: EntityStore> SyncEngine<S> {
    pub fn new(store: Arc<S>, source: Arc<dyn FeedSource>) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            store,
            source,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            in_flight: Mutex::new(()),
            state,
            transitions,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current state snapshot.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Watches the current state, for progress display. Intermediate states
    /// may be skipped if the receiver falls behind.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Every state entered after this call, in order.
    pub fn transitions(&self) -> broadcast::Receiver<SyncState> {
        self.transitions.subscribe()
    }

    /// Runs one sync to completion.
    ///
    /// The returned error is also recorded as [`SyncState::Failed`], except
    /// for [`SyncError::AlreadyInProgress`], which leaves the running sync's
    /// state untouched.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Sync requested while another is running");
            return Err(SyncError::AlreadyInProgress);
        };

        tracing::info!(source = %self.source.describe(), "Starting sync");
        let started = Instant::now();

        match self.sync(started).await {
            Ok(report) => {
                tracing::info!(
                    breweries = report.breweries_upserted,
                    beers = report.beers_upserted,
                    skipped = report.skipped_count,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Sync succeeded"
                );
                self.transition(SyncState::Succeeded(report.clone()));
                Ok(report)
            }
            Err(e) => {
                let failure = e.to_failure();
                tracing::warn!(kind = %failure.kind, "Sync failed: {}", failure.detail);
                self.transition(SyncState::Failed(failure));
                Err(e)
            }
        }
    }

    async fn sync(&self, started: Instant) -> Result<SyncReport, SyncError> {
        self.transition(SyncState::Fetching);
        let raw = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout(self.fetch_timeout).into()),
        };

        self.transition(SyncState::Parsing);
        let feed = feed::parse(&raw)?;
        for entry in &feed.skipped {
            tracing::warn!(kind = %entry.kind, "Skipping feed entry: {}", entry);
        }

        self.transition(SyncState::Reconciling);
        let (breweries_upserted, beers_upserted) = self.reconcile(&feed).await?;

        Ok(SyncReport {
            breweries_upserted,
            beers_upserted,
            skipped_count: feed.skipped_count(),
            skipped: feed.skipped,
            elapsed: started.elapsed(),
        })
    }

    /// Upserts every producer, then its products, in feed order. Stops at the
    /// first store error; what was written before it stays written.
    async fn reconcile(&self, feed: &ParsedFeed) -> Result<(usize, usize), SyncError> {
        let mut breweries = HashSet::new();
        let mut beers = HashSet::new();

        for parsed in &feed.breweries {
            let brewery = self
                .store
                .upsert_brewery(&parsed.festival_id, &parsed.name, &parsed.location)
                .await?;
            breweries.insert(brewery.festival_id.clone());

            for product in &parsed.products {
                let beer = self
                    .store
                    .upsert_beer(&BeerUpsert {
                        festival_id: &product.festival_id,
                        name: &product.name,
                        abv: product.abv,
                        description: &product.notes,
                        style: &product.style,
                        status: &product.status_text,
                        dispense_method: &product.dispense,
                        brewery_id: &brewery.festival_id,
                    })
                    .await?;
                beers.insert(beer.festival_id);
            }
        }

        Ok((breweries.len(), beers.len()))
    }

    fn transition(&self, next: SyncState) {
        tracing::debug!(state = ?next, "Sync state");
        // No subscribers is fine
        let _ = self.transitions.send(next.clone());
        self.state.send_replace(next);
    }
}

/// Whether a periodic refresh is due, given the time of the last successful
/// sync.
pub fn refresh_due(last: Option<DateTime<Utc>>, interval: Duration, now: DateTime<Utc>) -> bool {
    let Some(last) = last else {
        return true;
    };
    match chrono::Duration::from_std(interval) {
        Ok(interval) => now - last >= interval,
        Err(_) => false,
    }
}
