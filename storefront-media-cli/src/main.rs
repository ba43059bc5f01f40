//! storefront-media CLI tool

#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{ConfigCommand, DeleteCommand, ListCommand, ServeCommand, UploadCommand};
use std::path::PathBuf;
use storefront_media::config::MediaConfig;

#[derive(Parser)]
#[command(name = "storefront-media")]
#[command(version)]
#[command(about = "Upload, browse and serve storefront media", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./storefront-media.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, compress and upload images
    Upload(UploadCommand),
    /// List stored images
    List(ListCommand),
    /// Delete stored images by key
    Delete(DeleteCommand),
    /// Serve the gallery API and the stored files
    Serve(ServeCommand),
    /// Print the effective configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    storefront_media::observability::init()?;

    let config = MediaConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    match cli.command {
        Commands::Upload(cmd) => cmd.execute(&config).await,
        Commands::List(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Config(cmd) => cmd.execute(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["storefront-media", "list", "--config", "media.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("media.toml")));
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn test_upload_requires_files() {
        assert!(Cli::try_parse_from(["storefront-media", "upload"]).is_err());
    }
}
