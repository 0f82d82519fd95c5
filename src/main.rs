use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use beerfest::{BookmarkSet, Config, SqliteEntityStore};
use commands::{BeerCommand, BookmarkCommand, BreweryCommand, ConfigCommand, SyncCommand};

#[derive(Parser)]
#[command(name = "beerfest")]
#[command(version)]
#[command(about = "Browse and bookmark the beer festival list", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the local list from the festival feed
    Sync(SyncCommand),

    /// List and inspect beers
    Beer(BeerCommand),

    /// Inspect breweries
    Brewery(BreweryCommand),

    /// Manage bookmarked beers
    Bookmark(BookmarkCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "beerfest=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Sync(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(store, &config).await?;
        }
        Some(Commands::Beer(cmd)) => {
            let store = open_store(&config).await?;
            let bookmarks = Arc::new(BookmarkSet::open(&config.bookmarks_path.value)?);
            cmd.run(store, bookmarks).await?;
        }
        Some(Commands::Brewery(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(store).await?;
        }
        Some(Commands::Bookmark(cmd)) => {
            let store = open_store(&config).await?;
            let bookmarks = Arc::new(BookmarkSet::open(&config.bookmarks_path.value)?);
            cmd.run(store, bookmarks).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<SqliteEntityStore>, beerfest::StoreError> {
    Ok(Arc::new(
        SqliteEntityStore::open(&config.database_path.value).await?,
    ))
}
