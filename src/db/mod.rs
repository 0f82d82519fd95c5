mod entity_repo;
mod sync_log;

pub use entity_repo::SqliteEntityStore;
pub use sync_log::{SyncLog, SyncLogEntry};

use async_trait::async_trait;
use futures::stream::BoxStream;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Beer, Brewery};

/// Collation used for name ordering. Unlike SQLite's `NOCASE` it folds
/// case for all of Unicode, not just ASCII.
const NAME_COLLATION: &str = "BEER_NOCASE";

/// How long a writer waits for SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised by the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Failed to create database directory '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A beer referenced a brewery that is not in the store.
    #[error("Brewery not found: {0}")]
    UnknownBrewery(String),
    #[error("Invalid abv {abv} for beer {festival_id}")]
    InvalidAbv { festival_id: String, abv: f64 },
}

/// Field values for a beer upsert. `brewery_id` is the festival id of a
/// brewery that must already be in the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeerUpsert<'a> {
    pub festival_id: &'a str,
    pub name: &'a str,
    pub abv: f64,
    pub description: &'a str,
    pub style: &'a str,
    pub status: &'a str,
    pub dispense_method: &'a str,
    pub brewery_id: &'a str,
}

/// Durable keyed storage for breweries and beers.
///
/// Upserts are keyed by festival id and durable once they return. Beer
/// sequences are ordered by name (case-insensitive), then festival id.
/// Nothing here deletes rows: an entity missing from a later feed stays in
/// the store until it is purged by some other means.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Creates the brewery, or updates its name and description in place.
    async fn upsert_brewery(
        &self,
        festival_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Brewery, StoreError>;

    /// Creates the beer, or updates its fields in place.
    ///
    /// Fails with [`StoreError::UnknownBrewery`] if the referenced brewery
    /// has not been upserted yet.
    async fn upsert_beer(&self, beer: &BeerUpsert<'_>) -> Result<Beer, StoreError>;

    /// Number of beers in the store.
    async fn count(&self) -> Result<i64, StoreError>;

    /// Number of breweries in the store.
    async fn brewery_count(&self) -> Result<i64, StoreError>;

    /// Streams every beer in display order.
    ///
    /// Each call starts a fresh read, so the stream can be restarted by
    /// calling again; a running stream does not observe later writes.
    fn all(&self) -> BoxStream<'_, Result<Beer, StoreError>>;

    async fn find_by_id(&self, festival_id: &str) -> Result<Option<Beer>, StoreError>;

    async fn find_brewery(&self, festival_id: &str) -> Result<Option<Brewery>, StoreError>;

    /// Beers made by one brewery, in display order.
    async fn beers_by_brewery(&self, brewery_id: &str) -> Result<Vec<Beer>, StoreError>;
}

/// Opens (creating if needed) the database at `path` and runs migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .collation(NAME_COLLATION, fold_case_cmp);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Compares two names ignoring case.
fn fold_case_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
