//! `delete` command

use super::{asset_source, FAILURE, INFO, SUCCESS};
use anyhow::Result;
use clap::Args;
use console::style;
use dialoguer::Confirm;
use storefront_media::config::MediaConfig;
use storefront_media::gallery::{AssetRegistry, DeleteOutcome, SelectionMode};

/// Delete stored images by key
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Keys to delete (as printed by `list`)
    #[arg(required = true)]
    keys: Vec<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Base URL of a running gallery server instead of the local store
    #[arg(long)]
    remote: Option<String>,
}

impl DeleteCommand {
    /// Execute the delete command
    ///
    /// # Errors
    ///
    /// Returns an error if the listing or the delete call fails.
    pub async fn execute(&self, config: &MediaConfig) -> Result<()> {
        let source = asset_source(config, self.remote.as_deref()).await?;
        let mut registry = AssetRegistry::new(source, SelectionMode::Multiple);
        registry.refresh().await?;

        let known: Vec<_> = registry
            .assets()
            .iter()
            .filter(|asset| self.keys.contains(&asset.key))
            .cloned()
            .collect();
        for key in &self.keys {
            if !known.iter().any(|asset| &asset.key == key) {
                println!("{} {} {}", style(FAILURE).yellow(), style(key).dim(), style("not found").yellow());
            }
        }
        registry.select_multiple(&known);

        let yes = self.yes;
        let prompt = move |message: &str| {
            yes || Confirm::new()
                .with_prompt(message)
                .default(false)
                .interact()
                .unwrap_or(false)
        };

        match registry.delete_selected(&prompt).await? {
            DeleteOutcome::NothingSelected => {
                println!("{} Nothing to delete", INFO);
            }
            DeleteOutcome::Declined => {
                println!("{}", style("Cancelled.").dim());
            }
            DeleteOutcome::Deleted { requested, removed } => {
                println!(
                    "{} {} {removed} of {requested} image(s); {} remain",
                    style(SUCCESS).green(),
                    style("Deleted").green().bold(),
                    registry.assets().len()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use storefront_media::storage::{LocalObjectStore, ObjectStore, UploadOptions};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        delete: DeleteCommand,
    }

    fn parse(args: &[&str]) -> DeleteCommand {
        Harness::try_parse_from(std::iter::once("delete").chain(args.iter().copied()))
            .unwrap()
            .delete
    }

    #[tokio::test]
    async fn test_deletes_known_keys_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MediaConfig::default();
        config.storage.root = dir.path().to_path_buf();

        let store = LocalObjectStore::new(dir.path().to_path_buf(), "http://localhost/media").unwrap();
        store.ensure_bucket("branding").await.unwrap();
        for key in ["a.png", "b.png"] {
            store
                .upload("branding", key, vec![1u8; 4].into(), UploadOptions::new("image/png"))
                .await
                .unwrap();
        }

        parse(&["a.png", "missing.png", "--yes"]).execute(&config).await.unwrap();

        let remaining = store.list("branding").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "b.png");
    }

    #[test]
    fn test_keys_required() {
        assert!(Harness::try_parse_from(["delete", "--yes"]).is_err());
    }
}
