//! `list` command

use super::{asset_source, human_size, INFO};
use anyhow::Result;
use clap::Args;
use console::style;
use storefront_media::config::MediaConfig;
use storefront_media::gallery::{AssetRegistry, RemoteAsset, SelectionMode, SortOrder};

/// List stored images
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Case-insensitive substring filter on the file name
    #[arg(short, long)]
    search: Option<String>,

    /// Sort order (date-desc, date-asc, name-asc, name-desc, size-asc, size-desc)
    #[arg(long, default_value_t = SortOrder::DateDesc)]
    sort: SortOrder,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Base URL of a running gallery server instead of the local store
    #[arg(long)]
    remote: Option<String>,
}

impl ListCommand {
    /// Execute the list command
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn execute(&self, config: &MediaConfig) -> Result<()> {
        let source = asset_source(config, self.remote.as_deref()).await?;
        let mut registry = AssetRegistry::new(source, SelectionMode::Multiple);
        registry.refresh().await?;
        if let Some(term) = &self.search {
            registry.set_search(term.as_str());
        }
        registry.set_sort(self.sort);

        let visible = registry.visible();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&visible)?);
            return Ok(());
        }

        println!("\n{} {}", INFO, style(self.header(visible.len(), registry.assets().len())).bold());
        println!("{}", "─".repeat(96));
        println!("{:<48} {:>10} {:>11} {:<20}", "Key", "Size", "Dimensions", "Created");
        println!("{}", "─".repeat(96));
        if visible.is_empty() {
            println!("  {}", style("(No images to display)").dim());
        }
        for asset in visible {
            println!("{}", row(asset));
        }
        println!();
        Ok(())
    }

    fn header(&self, shown: usize, total: usize) -> String {
        match &self.search {
            Some(term) if !term.trim().is_empty() => {
                format!("{shown} of {total} images matching \"{}\" ({})", term.trim(), self.sort)
            }
            _ => format!("{total} images ({})", self.sort),
        }
    }
}

fn row(asset: &RemoteAsset) -> String {
    let dimensions = match (asset.width, asset.height) {
        (Some(w), Some(h)) => format!("{w}x{h}"),
        _ => "-".to_string(),
    };
    format!(
        "{:<48} {:>10} {:>11} {:<20}",
        asset.key,
        human_size(asset.size_bytes),
        dimensions,
        asset.created_at.format("%Y-%m-%d %H:%M:%S")
    )
}
