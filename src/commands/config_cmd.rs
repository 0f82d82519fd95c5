use clap::{Args, Subcommand};

use super::OutputFormat;
use beerfest::config::{Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        let feed_url = ConfigValue::new(
                            config.feed_url.value.as_deref().unwrap_or("(not set)"),
                            config.feed_url.source,
                        );
                        print_value("feed_url", &feed_url);
                        print_value(
                            "database_path",
                            &ConfigValue::new(
                                config.database_path.value.display(),
                                config.database_path.source,
                            ),
                        );
                        print_value(
                            "bookmarks_path",
                            &ConfigValue::new(
                                config.bookmarks_path.value.display(),
                                config.bookmarks_path.source,
                            ),
                        );
                        print_value("fetch_timeout_secs", &config.fetch_timeout_secs);
                        print_value("refresh_interval_mins", &config.refresh_interval_mins);
                    }
                }
                Ok(())
            }
        }
    }
}

fn print_value<T: std::fmt::Display>(name: &str, value: &ConfigValue<T>) {
    println!("{}: {}", name, value.value);
    println!("  source: {}", value.source);
    println!();
}
