//! Beer festival list synchronization.
//!
//! Pulls the festival's JSON feed of producers and products, reconciles it
//! into a local SQLite store, and serves ordered beer lists with optional
//! bookmark filtering.

pub mod bookmarks;
pub mod config;
pub mod db;
pub mod feed;
pub mod models;
pub mod sync;
pub mod view;

pub use bookmarks::{BookmarkError, BookmarkPreferences, BookmarkSet};
pub use config::{Config, ConfigError};
pub use db::{init_db, BeerUpsert, EntityStore, SqliteEntityStore, StoreError, SyncLog, SyncLogEntry};
pub use feed::{parse, FeedError, FeedSource, FetchError, ParsedFeed};
pub use models::{Beer, Brewery};
pub use sync::{SyncEngine, SyncError, SyncErrorKind, SyncFailure, SyncReport, SyncState};
pub use view::{BeerListView, SortOrder, ViewFilter, ViewOptions};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
