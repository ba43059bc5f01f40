//! Gallery over persisted assets
//!
//! The [`AssetRegistry`] lists, searches, sorts, selects and deletes assets
//! that already live in the bucket. It reads through an [`AssetSource`]:
//! either [`BucketAssets`] over an [`ObjectStore`](crate::storage::ObjectStore)
//! or [`HttpAssetSource`] over the JSON API.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront_media::gallery::{AssetRegistry, SelectionMode, SortOrder};
//! use storefront_media::storage::InMemoryObjectStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryObjectStore::with_buckets("https://cdn.test", ["branding"]));
//! let mut gallery = AssetRegistry::for_bucket(store, "branding", SelectionMode::Multiple)
//!     .on_select_multiple(|urls| println!("chosen: {urls:?}"));
//!
//! gallery.refresh().await?;
//! gallery.set_search("logo");
//! gallery.set_sort(SortOrder::NameAsc);
//! for asset in gallery.visible() {
//!     println!("{} ({} bytes)", asset.name(), asset.size_bytes);
//! }
//! # Ok(())
//! # }
//! ```

mod asset;
mod registry;
mod source;

pub use asset::{arrange, RemoteAsset, SortOrder};
pub use registry::{AssetRegistry, ConfirmPrompt, DeleteOutcome, SelectionMode};
#[cfg(test)]
pub use source::MockAssetSource;
pub use source::{AssetSource, BucketAssets, HttpAssetSource};
