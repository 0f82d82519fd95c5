//! Display-ready beer lists.

use futures::future;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::bookmarks::BookmarkPreferences;
use crate::db::{EntityStore, StoreError};
use crate::models::Beer;

/// Ordering of a list view. Name ascending is the only one supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NameAscending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewFilter {
    #[default]
    All,
    BookmarkedOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub sort_order: SortOrder,
    pub filter: ViewFilter,
}

impl ViewOptions {
    pub fn bookmarked_only() -> Self {
        Self {
            filter: ViewFilter::BookmarkedOnly,
            ..Self::default()
        }
    }
}

/// An ordered list of beers backed by the store.
///
/// Each call to [`iter`](Self::iter) reads the store afresh and takes a
/// snapshot of the bookmarks at that moment, so bookmark changes show up on
/// the next iteration but never in one already running.
pub struct BeerListView<S: EntityStore> {
    store: Arc<S>,
    bookmarks: Option<Arc<dyn BookmarkPreferences>>,
    options: ViewOptions,
}

impl<S: EntityStore> BeerListView<S> {
    pub fn new(store: Arc<S>, options: ViewOptions) -> Self {
        Self {
            store,
            bookmarks: None,
            options,
        }
    }

    /// Bookmark source for [`ViewFilter::BookmarkedOnly`]. Without one the
    /// bookmarked view is empty.
    pub fn with_bookmarks(mut self, bookmarks: Arc<dyn BookmarkPreferences>) -> Self {
        self.bookmarks = Some(bookmarks);
        self
    }

    pub fn options(&self) -> ViewOptions {
        self.options
    }

    /// Number of beers the view currently holds.
    pub async fn size(&self) -> Result<i64, StoreError> {
        match self.options.filter {
            ViewFilter::All => self.store.count().await,
            ViewFilter::BookmarkedOnly => {
                self.iter()
                    .try_fold(0, |count, _| future::ready(Ok(count + 1)))
                    .await
            }
        }
    }

    /// Streams the view's beers in name order.
    pub fn iter(&self) -> BoxStream<'_, Result<Beer, StoreError>> {
        let beers = match self.options.sort_order {
            SortOrder::NameAscending => self.store.all(),
        };

        match self.options.filter {
            ViewFilter::All => beers,
            ViewFilter::BookmarkedOnly => {
                let ids = self
                    .bookmarks
                    .as_ref()
                    .map(|b| b.bookmarked_ids())
                    .unwrap_or_default();
                beers
                    .try_filter(move |beer| future::ready(ids.contains(&beer.festival_id)))
                    .boxed()
            }
        }
    }

    /// Collects the current contents of the view.
    pub async fn to_vec(&self) -> Result<Vec<Beer>, StoreError> {
        self.iter().try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::BookmarkSet;
    use crate::db::{BeerUpsert, SqliteEntityStore};
    use tempfile::TempDir;

    struct TestContext {
        store: Arc<SqliteEntityStore>,
        bookmarks: Arc<BookmarkSet>,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteEntityStore::open(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        store.upsert_brewery("b1", "Milton", "").await.unwrap();
        for (id, name) in [("p1", "Pegasus"), ("p2", "minotaur"), ("p3", "Cyclops")] {
            store
                .upsert_beer(&BeerUpsert {
                    festival_id: id,
                    name,
                    abv: 4.0,
                    description: "",
                    style: "",
                    status: "",
                    dispense_method: "",
                    brewery_id: "b1",
                })
                .await
                .unwrap();
        }
        TestContext {
            store: Arc::new(store),
            bookmarks: Arc::new(BookmarkSet::in_memory()),
            _temp_dir: temp_dir,
        }
    }

    fn ids(beers: &[Beer]) -> Vec<&str> {
        beers.iter().map(|b| b.festival_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_all_view_is_name_ordered() {
        let ctx = setup().await;
        let view = BeerListView::new(Arc::clone(&ctx.store), ViewOptions::default());

        assert_eq!(view.size().await.unwrap(), 3);
        let beers = view.to_vec().await.unwrap();
        assert_eq!(ids(&beers), vec!["p3", "p2", "p1"]);
    }

    #[tokio::test]
    async fn test_bookmarked_view_is_subset_of_all() {
        let ctx = setup().await;
        ctx.bookmarks.add("p1").unwrap();
        ctx.bookmarks.add("p3").unwrap();
        // Bookmarks for beers not in the store are ignored
        ctx.bookmarks.add("gone").unwrap();

        let view = BeerListView::new(Arc::clone(&ctx.store), ViewOptions::bookmarked_only())
            .with_bookmarks(ctx.bookmarks.clone());

        assert_eq!(view.size().await.unwrap(), 2);
        let beers = view.to_vec().await.unwrap();
        assert_eq!(ids(&beers), vec!["p3", "p1"]);

        let all = BeerListView::new(Arc::clone(&ctx.store), ViewOptions::default())
            .to_vec()
            .await
            .unwrap();
        let expected: Vec<Beer> = all
            .into_iter()
            .filter(|b| ctx.bookmarks.is_bookmarked(&b.festival_id))
            .collect();
        assert_eq!(beers, expected);
    }

    #[tokio::test]
    async fn test_bookmark_toggle_applies_to_next_iteration_only() {
        let ctx = setup().await;
        ctx.bookmarks.add("p1").unwrap();
        let view = BeerListView::new(Arc::clone(&ctx.store), ViewOptions::bookmarked_only())
            .with_bookmarks(ctx.bookmarks.clone());

        let mut running = view.iter();
        ctx.bookmarks.toggle("p2").unwrap();
        ctx.bookmarks.toggle("p1").unwrap();

        let first = running.try_next().await.unwrap().unwrap();
        assert_eq!(first.festival_id, "p1");
        assert!(running.try_next().await.unwrap().is_none());
        drop(running);

        let beers = view.to_vec().await.unwrap();
        assert_eq!(ids(&beers), vec!["p2"]);
    }

    #[tokio::test]
    async fn test_bookmarked_view_without_bookmarks_is_empty() {
        let ctx = setup().await;
        let view = BeerListView::new(Arc::clone(&ctx.store), ViewOptions::bookmarked_only());
        assert_eq!(view.size().await.unwrap(), 0);
        assert_eq!(view.options().filter, ViewFilter::BookmarkedOnly);
    }

    #[tokio::test]
    async fn test_view_reflects_store_changes_on_new_iteration() {
        let ctx = setup().await;
        let view = BeerListView::new(Arc::clone(&ctx.store), ViewOptions::default());
        assert_eq!(view.to_vec().await.unwrap().len(), 3);

        ctx.store
            .upsert_beer(&BeerUpsert {
                festival_id: "p4",
                name: "Alpha",
                abv: 5.0,
                description: "",
                style: "",
                status: "",
                dispense_method: "",
                brewery_id: "b1",
            })
            .await
            .unwrap();

        let beers = view.to_vec().await.unwrap();
        assert_eq!(beers[0].festival_id, "p4");
        assert_eq!(view.size().await.unwrap(), 4);
    }
}
