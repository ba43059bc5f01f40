//! CLI command implementations

pub mod config;
pub mod delete;
pub mod list;
pub mod serve;
pub mod upload;

pub use config::ConfigCommand;
pub use delete::DeleteCommand;
pub use list::ListCommand;
pub use serve::ServeCommand;
pub use upload::UploadCommand;

use anyhow::{Context, Result};
use console::Emoji;
use std::sync::Arc;
use storefront_media::config::MediaConfig;
use storefront_media::gallery::{AssetSource, BucketAssets, HttpAssetSource};
use storefront_media::storage::LocalObjectStore;

pub(crate) static SUCCESS: Emoji = Emoji("✓", "√");
pub(crate) static FAILURE: Emoji = Emoji("✗", "x");
pub(crate) static INFO: Emoji = Emoji("ℹ", "i");

/// Opens the configured local store, creating the bucket directory
pub(crate) async fn open_store(config: &MediaConfig) -> Result<Arc<LocalObjectStore>> {
    let store = LocalObjectStore::new(config.storage.root.clone(), config.storage.public_base_url.clone())
        .with_context(|| format!("Failed to open store at {}", config.storage.root.display()))?;
    store
        .ensure_bucket(&config.storage.bucket)
        .await
        .with_context(|| format!("Failed to prepare bucket {}", config.storage.bucket))?;
    Ok(Arc::new(store))
}

/// Picks the gallery source: a running server when `remote` is set, the local store otherwise
pub(crate) async fn asset_source(config: &MediaConfig, remote: Option<&str>) -> Result<Arc<dyn AssetSource>> {
    if let Some(base_url) = remote {
        return Ok(Arc::new(HttpAssetSource::new(base_url)));
    }
    let store = open_store(config).await?;
    Ok(Arc::new(BucketAssets::new(store, config.storage.bucket.clone())))
}

/// Formats a byte count with a binary unit
#[allow(clippy::cast_precision_loss)]
pub(crate) fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
