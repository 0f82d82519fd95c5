//! Sync error types.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::db::StoreError;
use crate::feed::{FeedError, FetchError};

/// Coarse classification of a failed sync, for callers deciding what to do
/// next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    FetchError,
    ParseError,
    StoreError,
    SyncAlreadyInProgress,
}

impl SyncErrorKind {
    /// Whether running the sync again later can succeed without the feed
    /// itself changing.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncErrorKind::ParseError)
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErrorKind::FetchError => write!(f, "fetch_error"),
            SyncErrorKind::ParseError => write!(f, "parse_error"),
            SyncErrorKind::StoreError => write!(f, "store_error"),
            SyncErrorKind::SyncAlreadyInProgress => write!(f, "sync_already_in_progress"),
        }
    }
}

/// Errors that end a sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to parse feed: {0}")]
    Parse(#[from] FeedError),
    #[error("Failed to store feed: {0}")]
    Store(#[from] StoreError),
    #[error("A sync is already in progress")]
    AlreadyInProgress,
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Fetch(_) => SyncErrorKind::FetchError,
            SyncError::Parse(_) => SyncErrorKind::ParseError,
            SyncError::Store(_) => SyncErrorKind::StoreError,
            SyncError::AlreadyInProgress => SyncErrorKind::SyncAlreadyInProgress,
        }
    }

    /// Cloneable summary suitable for display or for a state snapshot.
    pub fn to_failure(&self) -> SyncFailure {
        SyncFailure {
            kind: self.kind(),
            detail: self.to_string(),
        }
    }
}

/// A failed sync as reported to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub kind: SyncErrorKind,
    pub detail: String,
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.detail)
    }
}
