//! Object storage abstraction and implementations
//!
//! This module provides a trait-based abstraction over bucket-oriented
//! object storage with two backends:
//! - Local filesystem storage (development and single-node deployments)
//! - In-memory storage (tests and demos)
//!
//! # Architecture
//!
//! The [`ObjectStore`] trait mirrors the four calls the media pipeline
//! needs: `upload`, `public_url`, `list` and `remove`. The upload
//! orchestrator and the asset registry receive a store and a bucket name
//! explicitly at construction, so several buckets (or several backends) can
//! coexist in one process.
//!
//! # Examples
//!
//! ```rust,no_run
//! use storefront_media::storage::{key, LocalObjectStore, ObjectStore, UploadOptions};
//! use std::path::PathBuf;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = LocalObjectStore::new(PathBuf::from("/var/media"), "http://localhost:3000/media")?;
//! store.ensure_bucket("branding").await?;
//!
//! let key = key::generate_key("logos", "png");
//! let receipt = store
//!     .upload("branding", &key, vec![/* ... */].into(), UploadOptions::new("image/png"))
//!     .await?;
//! println!("Stored at {}", store.public_url("branding", &receipt.path));
//! # Ok(())
//! # }
//! ```

pub mod key;
mod local;
mod memory;
mod traits;
mod types;

pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
#[cfg(test)]
pub use traits::MockObjectStore;
pub use traits::ObjectStore;
pub use types::{
    is_image_type, ObjectEntry, ObjectMetadata, RemoveSummary, SelectedFile, StorageError,
    StorageResult, UploadOptions, UploadReceipt,
};
