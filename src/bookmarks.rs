//! User bookmarks on beers.
//!
//! Bookmarks live outside the entity store so that re-syncing the feed never
//! touches them. The read side is the [`BookmarkPreferences`] trait; the
//! list view depends only on that.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Read access to the set of bookmarked beer ids.
pub trait BookmarkPreferences: Send + Sync {
    /// Snapshot of every bookmarked festival id.
    fn bookmarked_ids(&self) -> HashSet<String>;

    fn is_bookmarked(&self, festival_id: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("Failed to read bookmarks '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write bookmarks '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse bookmarks '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize bookmarks: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Bookmark set persisted as a JSON array of ids.
///
/// Every mutation is written through to disk before it returns.
#[derive(Debug, Default)]
pub struct BookmarkSet {
    path: Option<PathBuf>,
    ids: RwLock<BTreeSet<String>>,
}

impl BookmarkSet {
    /// A set that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the set stored at `path`. A missing file is an empty set.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BookmarkError> {
        let path = path.into();
        let ids = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| BookmarkError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&contents).map_err(|source| BookmarkError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path: Some(path),
            ids: RwLock::new(ids),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bookmarks a beer. Returns false if it was already bookmarked.
    pub fn add(&self, festival_id: &str) -> Result<bool, BookmarkError> {
        self.update(|ids| ids.insert(festival_id.to_string()))
    }

    /// Removes a bookmark. Returns false if it was not bookmarked.
    pub fn remove(&self, festival_id: &str) -> Result<bool, BookmarkError> {
        self.update(|ids| ids.remove(festival_id))
    }

    /// Flips a bookmark and returns whether the beer is now bookmarked.
    pub fn toggle(&self, festival_id: &str) -> Result<bool, BookmarkError> {
        self.update(|ids| {
            if ids.remove(festival_id) {
                false
            } else {
                ids.insert(festival_id.to_string());
                true
            }
        })
    }

    /// Bookmarked ids in sorted order.
    pub fn sorted_ids(&self) -> Vec<String> {
        self.read().iter().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeSet<String>> {
        self.ids.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<T>(&self, f: impl FnOnce(&mut BTreeSet<String>) -> T) -> Result<T, BookmarkError> {
        let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = ids.clone();
        let result = f(&mut next);

        if next != *ids {
            // Memory only changes once the file is written
            self.save(&next)?;
            *ids = next;
        }
        Ok(result)
    }

    fn save(&self, ids: &BTreeSet<String>) -> Result<(), BookmarkError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BookmarkError::Write {
                path: path.clone(),
                source,
            })?;
        }

        let contents = serde_json::to_string_pretty(ids).map_err(BookmarkError::Serialize)?;

        // Atomic replace via rename
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .and_then(|_| std::fs::rename(&tmp, path))
            .map_err(|source| BookmarkError::Write {
                path: path.clone(),
                source,
            })
    }
}

impl BookmarkPreferences for BookmarkSet {
    fn bookmarked_ids(&self) -> HashSet<String> {
        self.read().iter().cloned().collect()
    }

    fn is_bookmarked(&self, festival_id: &str) -> bool {
        self.read().contains(festival_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_toggle() {
        let bookmarks = BookmarkSet::in_memory();
        assert!(!bookmarks.is_bookmarked("p1"));

        assert!(bookmarks.toggle("p1").unwrap());
        assert!(bookmarks.is_bookmarked("p1"));

        assert!(!bookmarks.toggle("p1").unwrap());
        assert!(!bookmarks.is_bookmarked("p1"));
        assert!(bookmarks.path().is_none());
    }

    #[test]
    fn test_add_and_remove_report_changes() {
        let bookmarks = BookmarkSet::in_memory();
        assert!(bookmarks.add("p1").unwrap());
        assert!(!bookmarks.add("p1").unwrap());
        assert!(bookmarks.remove("p1").unwrap());
        assert!(!bookmarks.remove("p1").unwrap());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = tempdir().unwrap();
        let bookmarks = BookmarkSet::open(temp_dir.path().join("bookmarks.json")).unwrap();
        assert!(bookmarks.bookmarked_ids().is_empty());
    }

    #[test]
    fn test_persists_across_open() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("bookmarks.json");

        let bookmarks = BookmarkSet::open(&path).unwrap();
        bookmarks.add("p2").unwrap();
        bookmarks.add("p1").unwrap();
        drop(bookmarks);

        let reopened = BookmarkSet::open(&path).unwrap();
        assert_eq!(reopened.sorted_ids(), vec!["p1", "p2"]);
        assert!(reopened.is_bookmarked("p2"));
    }

    #[test]
    fn test_failed_write_keeps_file_and_memory() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bookmarks.json");

        let bookmarks = BookmarkSet::open(&path).unwrap();
        bookmarks.add("p1").unwrap();

        // A directory where the temp file goes makes the next write fail
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();

        let err = bookmarks.add("p2").unwrap_err();
        assert!(matches!(err, BookmarkError::Write { .. }));
        assert_eq!(bookmarks.sorted_ids(), vec!["p1"]);

        let reopened = BookmarkSet::open(&path).unwrap();
        assert_eq!(reopened.sorted_ids(), vec!["p1"]);
    }

    #[test]
    fn test_corrupt_file_errors() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bookmarks.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = BookmarkSet::open(&path).unwrap_err();
        assert!(matches!(err, BookmarkError::Parse { .. }));
    }
}
