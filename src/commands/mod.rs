mod beer;
mod bookmark;
mod brewery;
mod config_cmd;
mod sync_cmd;

use clap::ValueEnum;

pub use beer::BeerCommand;
pub use bookmark::BookmarkCommand;
pub use brewery::BreweryCommand;
pub use config_cmd::ConfigCommand;
pub use sync_cmd::SyncCommand;

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
