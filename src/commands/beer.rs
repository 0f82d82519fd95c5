use clap::{Args, Subcommand};
use futures::TryStreamExt;
use std::sync::Arc;

use super::OutputFormat;
use beerfest::bookmarks::{BookmarkPreferences, BookmarkSet};
use beerfest::db::{EntityStore, SqliteEntityStore};
use beerfest::models::Beer;
use beerfest::view::{BeerListView, ViewOptions};

#[derive(Args)]
pub struct BeerCommand {
    #[command(subcommand)]
    pub command: BeerSubcommand,
}

#[derive(Subcommand)]
pub enum BeerSubcommand {
    /// List beers in name order
    List {
        /// Only show bookmarked beers
        #[arg(long, short)]
        bookmarked: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a beer's details
    Show {
        /// Festival id of the beer
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl BeerCommand {
    pub async fn run(
        &self,
        store: Arc<SqliteEntityStore>,
        bookmarks: Arc<BookmarkSet>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BeerSubcommand::List { bookmarked, format } => {
                let options = if *bookmarked {
                    ViewOptions::bookmarked_only()
                } else {
                    ViewOptions::default()
                };
                let view = BeerListView::new(store, options).with_bookmarks(bookmarks.clone());

                match format {
                    OutputFormat::Json => {
                        let beers = view.to_vec().await?;
                        println!("{}", serde_json::to_string_pretty(&beers)?);
                    }
                    OutputFormat::Text => {
                        let mut shown = 0;
                        let mut beers = view.iter();
                        while let Some(beer) = beers.try_next().await? {
                            print_row(&beer, bookmarks.is_bookmarked(&beer.festival_id));
                            shown += 1;
                        }
                        if shown == 0 {
                            if *bookmarked {
                                println!("No bookmarked beers.");
                            } else {
                                println!("No beers found. Run 'beerfest sync' first.");
                            }
                        }
                    }
                }
                Ok(())
            }
            BeerSubcommand::Show { id, format } => {
                let beer = store
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| format!("Beer not found: {}", id))?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&beer)?);
                    }
                    OutputFormat::Text => {
                        print_beer(&beer, bookmarks.is_bookmarked(&beer.festival_id));
                    }
                }
                Ok(())
            }
        }
    }
}

fn print_row(beer: &Beer, bookmarked: bool) {
    let marker = if bookmarked { "*" } else { " " };
    let mut line = format!(
        "{} {:<12} {} ({:.1}%) - {}",
        marker, beer.festival_id, beer.name, beer.abv, beer.brewery.name
    );
    if !beer.style.is_empty() {
        line.push_str(&format!(" [{}]", beer.style));
    }
    println!("{}", line);
}

fn print_beer(beer: &Beer, bookmarked: bool) {
    print!("{}", beer);
    println!("\nBookmarked: {}", if bookmarked { "yes" } else { "no" });
}
