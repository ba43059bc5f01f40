//! storefront-media: image ingestion and gallery for storefront administration
//!
//! Logos, favicons and carousel slides enter the system through one
//! pipeline and are browsed through one gallery:
//!
//! - [`media`]: validate selected files, probe their dimensions, compress
//!   them, and upload them as a concurrent batch with per-item status
//! - [`gallery`]: list, search, sort, select and delete stored assets
//! - [`storage`]: the object-store abstraction with local and in-memory
//!   backends
//! - [`http`]: a small JSON API over a bucket
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront_media::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     storefront_media::observability::init()?;
//!     let config = MediaConfig::load(None)?;
//!     config.validate()?;
//!
//!     let store = LocalObjectStore::new(config.storage.root.clone(), config.storage.public_base_url.clone())?;
//!     store.ensure_bucket(&config.storage.bucket).await?;
//!
//!     let orchestrator = UploadOrchestrator::new(Arc::new(store), &config.storage.bucket, config.uploader.clone())
//!         .with_profile(config.compression)
//!         .on_upload_complete(|outcome| println!("uploaded: {:?}", outcome.urls));
//!
//!     orchestrator.enqueue([SelectedFile::from_path("logo.png").await?]).await;
//!     orchestrator.start_batch().await;
//!     Ok(())
//! }
//! ```

#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod gallery;
pub mod http;
pub mod media;
pub mod observability;
pub mod storage;
pub mod testing;

pub use error::MediaError;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use storefront_media::prelude::*;
    //! ```

    pub use crate::config::{MediaConfig, UploaderConfig};
    pub use crate::error::MediaError;
    pub use crate::gallery::{AssetRegistry, AssetSource, RemoteAsset, SelectionMode, SortOrder};
    pub use crate::media::{
        AssetCandidate, BatchOutcome, CandidateStatus, CompressionProfile, Dimensions, OutputFormat,
        PreviewRenderer, UploadOrchestrator,
    };
    pub use crate::storage::{LocalObjectStore, ObjectStore, SelectedFile, StorageError};
}
