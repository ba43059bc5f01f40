//! Crate-level error type
//!
//! Each concern keeps its own error enum ([`StorageError`],
//! [`ValidationError`], [`PreviewError`](crate::media::preview::PreviewError));
//! [`MediaError`] gathers the ones that surface from setup and from the
//! HTTP boundary.

use crate::media::validation::ValidationError;
use crate::storage::StorageError;
use thiserror::Error;

/// Top-level error
#[derive(Debug, Error)]
pub enum MediaError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but violates a constraint
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage backend failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// File refused by the admission policy
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration could not be rendered back to TOML
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    /// I/O failure outside the storage backend
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
