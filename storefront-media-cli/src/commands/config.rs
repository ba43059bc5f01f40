//! `config` command

use anyhow::Result;
use clap::Args;
use console::style;
use storefront_media::config::MediaConfig;

/// Print the effective configuration
#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Print JSON instead of TOML
    #[arg(long)]
    json: bool,
}

impl ConfigCommand {
    /// Execute the config command
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be rendered.
    pub fn execute(&self, config: &MediaConfig) -> Result<()> {
        print!("{}", self.render(config)?);
        eprintln!(
            "{}",
            style("Defaults < storefront-media.toml < STOREFRONT_MEDIA_* environment").dim()
        );
        Ok(())
    }

    fn render(&self, config: &MediaConfig) -> Result<String> {
        if self.json {
            Ok(serde_json::to_string_pretty(config)? + "\n")
        } else {
            Ok(config.to_toml()?)
        }
    }
}
