//! Feed synchronization.
//!
//! A sync walks `Idle -> Fetching -> Parsing -> Reconciling` and ends in
//! `Succeeded` or `Failed`. Reconciliation upserts each producer and then its
//! products, in feed order. Upserts are idempotent, so a sync that failed
//! part-way can simply be run again. Nothing is retried automatically.

mod engine;
mod error;

pub use engine::{refresh_due, SyncEngine, SyncReport, SyncState, DEFAULT_FETCH_TIMEOUT};
pub use error::{SyncError, SyncErrorKind, SyncFailure};
