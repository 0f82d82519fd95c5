use clap::{Args, Subcommand};
use serde::Serialize;
use std::sync::Arc;

use super::OutputFormat;
use beerfest::db::{EntityStore, SqliteEntityStore};
use beerfest::models::{Beer, Brewery};

#[derive(Args)]
pub struct BreweryCommand {
    #[command(subcommand)]
    pub command: BrewerySubcommand,
}

#[derive(Subcommand)]
pub enum BrewerySubcommand {
    /// Show a brewery and the beers it brings
    Show {
        /// Festival id of the brewery
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Serialize)]
struct BreweryDetails<'a> {
    #[serde(flatten)]
    brewery: &'a Brewery,
    beers: &'a [Beer],
}

impl BreweryCommand {
    pub async fn run(&self, store: Arc<SqliteEntityStore>) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BrewerySubcommand::Show { id, format } => {
                let brewery = store
                    .find_brewery(id)
                    .await?
                    .ok_or_else(|| format!("Brewery not found: {}", id))?;
                let beers = store.beers_by_brewery(id).await?;

                match format {
                    OutputFormat::Json => {
                        let details = BreweryDetails {
                            brewery: &brewery,
                            beers: &beers,
                        };
                        println!("{}", serde_json::to_string_pretty(&details)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", brewery);
                        println!();
                        if beers.is_empty() {
                            println!("No beers listed.");
                        } else {
                            println!("Beers:");
                            for beer in &beers {
                                println!("  {:<12} {} ({:.1}%)", beer.festival_id, beer.name, beer.abv);
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
