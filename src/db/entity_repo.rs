use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::SqlitePool;
use std::path::Path;

use super::{init_db, BeerUpsert, EntityStore, StoreError};
use crate::models::{Beer, Brewery};

const SELECT_BEERS: &str = r#"
    SELECT b.festival_id, b.name, b.abv, b.description, b.style, b.status, b.dispense_method,
           br.festival_id AS brewery_festival_id,
           br.name AS brewery_name,
           br.description AS brewery_description
    FROM beers b
    JOIN breweries br ON br.id = b.brewery_id
"#;

const ORDER_BY_NAME: &str = "ORDER BY b.name COLLATE BEER_NOCASE ASC, b.festival_id ASC";

/// SQLite-backed [`EntityStore`].
#[derive(Debug, Clone)]
pub struct SqliteEntityStore {
    pool: SqlitePool,
    all_query: String,
    by_id_query: String,
    by_brewery_query: String,
}

#[derive(sqlx::FromRow)]
struct BreweryRow {
    festival_id: String,
    name: String,
    description: String,
}

impl From<BreweryRow> for Brewery {
    fn from(row: BreweryRow) -> Self {
        Brewery {
            festival_id: row.festival_id,
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BeerRow {
    festival_id: String,
    name: String,
    abv: f64,
    description: String,
    style: String,
    status: String,
    dispense_method: String,
    brewery_festival_id: String,
    brewery_name: String,
    brewery_description: String,
}

impl From<BeerRow> for Beer {
    fn from(row: BeerRow) -> Self {
        Beer {
            festival_id: row.festival_id,
            name: row.name,
            abv: row.abv,
            description: row.description,
            style: row.style,
            status: row.status,
            dispense_method: row.dispense_method,
            brewery: Brewery {
                festival_id: row.brewery_festival_id,
                name: row.brewery_name,
                description: row.brewery_description,
            },
        }
    }
}

impl SqliteEntityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            all_query: format!("{} {}", SELECT_BEERS, ORDER_BY_NAME),
            by_id_query: format!("{} WHERE b.festival_id = ?", SELECT_BEERS),
            by_brewery_query: format!("{} WHERE br.festival_id = ? {}", SELECT_BEERS, ORDER_BY_NAME),
        }
    }

    /// Opens the database file at `path`, running migrations as needed.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(init_db(path).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn upsert_brewery(
        &self,
        festival_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Brewery, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO breweries (festival_id, name, description)
            VALUES (?, ?, ?)
            ON CONFLICT(festival_id) DO UPDATE
            SET name = excluded.name, description = excluded.description
            "#,
        )
        .bind(festival_id)
        .bind(name)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        // Read back inside the transaction so the caller sees its own write
        let row: BreweryRow = sqlx::query_as(
            "SELECT festival_id, name, description FROM breweries WHERE festival_id = ?",
        )
        .bind(festival_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(festival_id, "Upserted brewery");
        Ok(row.into())
    }

    async fn upsert_beer(&self, beer: &BeerUpsert<'_>) -> Result<Beer, StoreError> {
        if !beer.abv.is_finite() || beer.abv < 0.0 {
            return Err(StoreError::InvalidAbv {
                festival_id: beer.festival_id.to_string(),
                abv: beer.abv,
            });
        }

        let mut tx = self.pool.begin().await?;

        // The brewery is resolved in the same statement; no row inserted
        // means the brewery does not exist.
        let result = sqlx::query(
            r#"
            INSERT INTO beers (festival_id, name, abv, description, style, status, dispense_method, brewery_id)
            SELECT ?, ?, ?, ?, ?, ?, ?, id FROM breweries WHERE festival_id = ?
            ON CONFLICT(festival_id) DO UPDATE
            SET name = excluded.name,
                abv = excluded.abv,
                description = excluded.description,
                style = excluded.style,
                status = excluded.status,
                dispense_method = excluded.dispense_method,
                brewery_id = excluded.brewery_id
            "#,
        )
        .bind(beer.festival_id)
        .bind(beer.name)
        .bind(beer.abv)
        .bind(beer.description)
        .bind(beer.style)
        .bind(beer.status)
        .bind(beer.dispense_method)
        .bind(beer.brewery_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownBrewery(beer.brewery_id.to_string()));
        }

        let row: BeerRow = sqlx::query_as(&self.by_id_query)
            .bind(beer.festival_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(festival_id = beer.festival_id, "Upserted beer");
        Ok(row.into())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM beers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn brewery_count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM breweries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    fn all(&self) -> BoxStream<'_, Result<Beer, StoreError>> {
        sqlx::query_as::<_, BeerRow>(&self.all_query)
            .fetch(&self.pool)
            .map(|row| row.map(Beer::from).map_err(StoreError::from))
            .boxed()
    }

    async fn find_by_id(&self, festival_id: &str) -> Result<Option<Beer>, StoreError> {
        let row: Option<BeerRow> = sqlx::query_as(&self.by_id_query)
            .bind(festival_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Beer::from))
    }

    async fn find_brewery(&self, festival_id: &str) -> Result<Option<Brewery>, StoreError> {
        let row: Option<BreweryRow> = sqlx::query_as(
            "SELECT festival_id, name, description FROM breweries WHERE festival_id = ?",
        )
        .bind(festival_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Brewery::from))
    }

    async fn beers_by_brewery(&self, brewery_id: &str) -> Result<Vec<Beer>, StoreError> {
        let rows: Vec<BeerRow> = sqlx::query_as(&self.by_brewery_query)
            .bind(brewery_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Beer::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct TestContext {
        store: SqliteEntityStore,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_store() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        TestContext {
            store: SqliteEntityStore::open(&db_path).await.unwrap(),
            _temp_dir: temp_dir,
        }
    }

    fn beer<'a>(festival_id: &'a str, name: &'a str, brewery_id: &'a str) -> BeerUpsert<'a> {
        BeerUpsert {
            festival_id,
            name,
            abv: 4.0,
            description: "",
            style: "",
            status: "",
            dispense_method: "",
            brewery_id,
        }
    }

    async fn names(store: &SqliteEntityStore) -> Vec<String> {
        let beers: Vec<Beer> = store.all().try_collect().await.unwrap();
        beers.into_iter().map(|b| b.name).collect()
    }

    #[tokio::test]
    async fn test_upsert_brewery_creates_then_updates() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let created = store.upsert_brewery("b1", "Milton", "Cambs").await.unwrap();
        assert_eq!(created, Brewery::new("b1", "Milton").with_description("Cambs"));

        let updated = store
            .upsert_brewery("b1", "Milton Brewery", "Milton, Cambs")
            .await
            .unwrap();
        assert_eq!(updated.festival_id, "b1");
        assert_eq!(updated.name, "Milton Brewery");
        assert_eq!(store.brewery_count().await.unwrap(), 1);

        let found = store.find_brewery("b1").await.unwrap().unwrap();
        assert_eq!(found, updated);
    }

    #[tokio::test]
    async fn test_upsert_beer_creates_then_updates() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.upsert_brewery("b1", "Milton", "").await.unwrap();

        let created = store
            .upsert_beer(&BeerUpsert {
                style: "Bitter",
                dispense_method: "cask",
                ..beer("p1", "Pegasus", "b1")
            })
            .await
            .unwrap();
        assert_eq!(created.style, "Bitter");
        assert_eq!(created.brewery.name, "Milton");

        let updated = store
            .upsert_beer(&BeerUpsert {
                abv: 4.3,
                status: "Sold out",
                ..beer("p1", "Pegasus", "b1")
            })
            .await
            .unwrap();
        assert_eq!(updated.abv, 4.3);
        assert_eq!(updated.status, "Sold out");
        assert!(updated.style.is_empty());
        assert_eq!(store.count().await.unwrap(), 1);

        let found = store.find_by_id("p1").await.unwrap().unwrap();
        assert_eq!(found, updated);
    }

    #[tokio::test]
    async fn test_upsert_beer_rejects_unknown_brewery() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let err = store.upsert_beer(&beer("p1", "Orphan", "nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownBrewery(id) if id == "nope"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_beer_rejects_negative_abv() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.upsert_brewery("b1", "Milton", "").await.unwrap();

        let err = store
            .upsert_beer(&BeerUpsert { abv: -1.0, ..beer("p1", "Pegasus", "b1") })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidAbv { .. }));
    }

    #[tokio::test]
    async fn test_beer_can_move_between_breweries() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.upsert_brewery("b1", "Milton", "").await.unwrap();
        store.upsert_brewery("b2", "Oakham", "").await.unwrap();

        store.upsert_beer(&beer("p1", "Collab", "b1")).await.unwrap();
        let moved = store.upsert_beer(&beer("p1", "Collab", "b2")).await.unwrap();
        assert_eq!(moved.brewery.festival_id, "b2");
        assert!(store.beers_by_brewery("b1").await.unwrap().is_empty());
        assert_eq!(store.beers_by_brewery("b2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_orders_case_insensitively_with_id_tiebreak() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.upsert_brewery("b1", "Milton", "").await.unwrap();

        for (id, name) in [
            ("p4", "citra"),
            ("p2", "Amber"),
            ("p3", "Citra"),
            ("p1", "brown ale"),
            ("p0", "Zephyr"),
        ] {
            store.upsert_beer(&beer(id, name, "b1")).await.unwrap();
        }

        let beers: Vec<Beer> = store.all().try_collect().await.unwrap();
        let order: Vec<(&str, &str)> = beers
            .iter()
            .map(|b| (b.festival_id.as_str(), b.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("p2", "Amber"),
                ("p1", "brown ale"),
                ("p3", "Citra"),
                ("p4", "citra"),
                ("p0", "Zephyr"),
            ]
        );
    }

    #[tokio::test]
    async fn test_all_folds_case_beyond_ascii() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.upsert_brewery("b1", "Brauerei", "").await.unwrap();

        for (id, name) in [
            ("p1", "Ézy"),
            ("p2", "éclair"),
            ("p3", "ÖLBAUM"),
            ("p4", "ölbaum"),
            ("p5", "apple"),
            ("p6", "Zebra"),
        ] {
            store.upsert_beer(&beer(id, name, "b1")).await.unwrap();
        }

        // Lowercased code point order, then festival id
        assert_eq!(
            names(store).await,
            vec!["apple", "Zebra", "éclair", "Ézy", "ÖLBAUM", "ölbaum"]
        );
        let by_brewery: Vec<String> = store
            .beers_by_brewery("b1")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.festival_id)
            .collect();
        assert_eq!(by_brewery, vec!["p5", "p6", "p2", "p1", "p3", "p4"]);
    }

    #[tokio::test]
    async fn test_all_is_restartable() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.upsert_brewery("b1", "Milton", "").await.unwrap();
        store.upsert_beer(&beer("p1", "Pegasus", "b1")).await.unwrap();

        assert_eq!(names(store).await, vec!["Pegasus"]);
        store.upsert_beer(&beer("p2", "Minotaur", "b1")).await.unwrap();
        assert_eq!(names(store).await, vec!["Minotaur", "Pegasus"]);
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let ctx = setup_store().await;
        assert!(ctx.store.find_by_id("nope").await.unwrap().is_none());
        assert!(ctx.store.find_brewery("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_brewery_rename_keeps_beer_identity() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.upsert_brewery("b1", "Milton", "").await.unwrap();
        store.upsert_beer(&beer("p1", "Pegasus", "b1")).await.unwrap();

        store.upsert_brewery("b1", "Milton Brewery", "").await.unwrap();

        let found = store.find_by_id("p1").await.unwrap().unwrap();
        assert_eq!(found.brewery.festival_id, "b1");
        assert_eq!(found.brewery.name, "Milton Brewery");
        assert_eq!(store.brewery_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_upserts_never_mix_fields() {
        let ctx = setup_store().await;
        let store = Arc::new(ctx.store.clone());
        store.upsert_brewery("b1", "Milton", "").await.unwrap();
        store.upsert_brewery("b2", "Oakham", "").await.unwrap();

        for _ in 0..20 {
            let first = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .upsert_beer(&BeerUpsert {
                            festival_id: "p1",
                            name: "Alpha",
                            abv: 3.5,
                            description: "first",
                            style: "Mild",
                            status: "Plenty",
                            dispense_method: "cask",
                            brewery_id: "b1",
                        })
                        .await
                })
            };
            let second = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .upsert_beer(&BeerUpsert {
                            festival_id: "p1",
                            name: "Beta",
                            abv: 6.5,
                            description: "second",
                            style: "IPA",
                            status: "Low",
                            dispense_method: "keg",
                            brewery_id: "b2",
                        })
                        .await
                })
            };
            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            let stored = store.find_by_id("p1").await.unwrap().unwrap();
            let is_first = stored.name == "Alpha"
                && stored.abv == 3.5
                && stored.description == "first"
                && stored.style == "Mild"
                && stored.status == "Plenty"
                && stored.dispense_method == "cask"
                && stored.brewery.festival_id == "b1";
            let is_second = stored.name == "Beta"
                && stored.abv == 6.5
                && stored.description == "second"
                && stored.style == "IPA"
                && stored.status == "Low"
                && stored.dispense_method == "keg"
                && stored.brewery.festival_id == "b2";
            assert!(is_first || is_second, "mixed fields: {:?}", stored);
        }

        assert_eq!(store.count().await.unwrap(), 1);
    }
}
