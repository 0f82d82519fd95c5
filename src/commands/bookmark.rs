use clap::{Args, Subcommand};
use std::sync::Arc;

use beerfest::bookmarks::BookmarkSet;
use beerfest::db::{EntityStore, SqliteEntityStore};

#[derive(Args)]
pub struct BookmarkCommand {
    #[command(subcommand)]
    pub command: BookmarkSubcommand,
}

#[derive(Subcommand)]
pub enum BookmarkSubcommand {
    /// Bookmark a beer
    Add {
        /// Festival id of the beer
        id: String,
    },

    /// Remove a bookmark
    Remove {
        /// Festival id of the beer
        id: String,
    },

    /// Bookmark a beer, or remove the bookmark if it is already set
    Toggle {
        /// Festival id of the beer
        id: String,
    },

    /// List bookmarked ids
    List,
}

impl BookmarkCommand {
    pub async fn run(
        &self,
        store: Arc<SqliteEntityStore>,
        bookmarks: Arc<BookmarkSet>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BookmarkSubcommand::Add { id } => {
                let name = beer_name(&store, id).await?;
                if bookmarks.add(id)? {
                    println!("Bookmarked {}", name);
                } else {
                    println!("{} is already bookmarked", name);
                }
            }
            BookmarkSubcommand::Remove { id } => {
                // Removal works for beers that have since left the list
                if bookmarks.remove(id)? {
                    println!("Removed bookmark: {}", id);
                } else {
                    println!("Not bookmarked: {}", id);
                }
            }
            BookmarkSubcommand::Toggle { id } => {
                let name = beer_name(&store, id).await?;
                if bookmarks.toggle(id)? {
                    println!("Bookmarked {}", name);
                } else {
                    println!("Removed bookmark: {}", name);
                }
            }
            BookmarkSubcommand::List => {
                let ids = bookmarks.sorted_ids();
                if ids.is_empty() {
                    println!("No bookmarks.");
                }
                for id in ids {
                    match store.find_by_id(&id).await? {
                        Some(beer) => println!("{:<12} {}", id, beer.name),
                        None => println!("{:<12} (not in current list)", id),
                    }
                }
            }
        }
        Ok(())
    }
}

async fn beer_name(
    store: &SqliteEntityStore,
    id: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let beer = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| format!("Beer not found: {}", id))?;
    Ok(beer.name)
}
