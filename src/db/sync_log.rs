use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::StoreError;

/// A record of one successful sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncLogEntry {
    pub synced_at: DateTime<Utc>,
    pub breweries_upserted: i64,
    pub beers_upserted: i64,
    pub skipped_count: i64,
    pub elapsed_ms: i64,
}

#[derive(sqlx::FromRow)]
struct SyncLogRow {
    synced_at: String,
    breweries_upserted: i64,
    beers_upserted: i64,
    skipped_count: i64,
    elapsed_ms: i64,
}

/// History of successful syncs, used to decide when a refresh is due.
#[derive(Debug, Clone)]
pub struct SyncLog {
    pool: SqlitePool,
}

impl SyncLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: &SyncLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_log (synced_at, breweries_upserted, beers_upserted, skipped_count, elapsed_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.synced_at.to_rfc3339())
        .bind(entry.breweries_upserted)
        .bind(entry.beers_upserted)
        .bind(entry.skipped_count)
        .bind(entry.elapsed_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The most recent successful sync, if any.
    pub async fn last(&self) -> Result<Option<SyncLogEntry>, StoreError> {
        let row: Option<SyncLogRow> = sqlx::query_as(
            r#"
            SELECT synced_at, breweries_upserted, beers_upserted, skipped_count, elapsed_ms
            FROM sync_log ORDER BY id DESC LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let synced_at = DateTime::parse_from_rfc3339(&row.synced_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Some(SyncLogEntry {
            synced_at,
            breweries_upserted: row.breweries_upserted,
            beers_upserted: row.beers_upserted,
            skipped_count: row.skipped_count,
            elapsed_ms: row.elapsed_ms,
        }))
    }
}
