//! Core types for object storage

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during object storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found in the bucket
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The bucket itself does not exist
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Credentials missing, expired or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials accepted but the operation is not permitted
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error during storage operation
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid object key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// An object already exists under the requested key
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// Storage quota exceeded
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// Object size exceeds the service limit
    #[error("Object size {actual} exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Actual object size
        actual: u64,
        /// Maximum allowed size
        limit: u64,
    },

    /// Transport-level failure talking to the storage service
    #[error("Network error: {0}")]
    Network(String),

    /// Generic storage error carrying the raw service message
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        match err.status().map(|s| s.as_u16()) {
            Some(401) => Self::Unauthorized(err.to_string()),
            Some(403) => Self::PermissionDenied(err.to_string()),
            Some(404) => Self::NotFound(err.to_string()),
            Some(413) => Self::PayloadTooLarge { actual: 0, limit: 0 },
            Some(_) => Self::Other(err.to_string()),
            None => Self::Network(err.to_string()),
        }
    }
}

/// Optional descriptive metadata persisted alongside an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Pixel width, when the object is a raster image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Pixel height, when the object is a raster image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// MIME content type the object was uploaded with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    /// File name the user originally selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

/// Options accompanying a single upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// MIME content type of the payload
    pub content_type: String,

    /// Descriptive metadata stored with the object
    pub metadata: ObjectMetadata,
}

impl UploadOptions {
    /// Creates upload options for a content type with empty metadata
    #[must_use]
    pub fn new(content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        Self {
            metadata: ObjectMetadata {
                mime: Some(content_type.clone()),
                ..ObjectMetadata::default()
            },
            content_type,
        }
    }

    /// Attaches pixel dimensions
    #[must_use]
    pub const fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.metadata.width = Some(width);
        self.metadata.height = Some(height);
        self
    }

    /// Attaches the name the user originally selected
    #[must_use]
    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.original_name = Some(name.into());
        self
    }
}

/// Acknowledgement of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Path of the stored object inside its bucket
    pub path: String,
}

/// Result of a bulk remove call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveSummary {
    /// Number of keys that existed and were removed
    pub deleted_count: usize,
}

/// One object as reported by a bucket listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key (path inside the bucket)
    pub name: String,

    /// Publicly reachable URL
    pub url: String,

    /// Upload timestamp
    pub created_at: DateTime<Utc>,

    /// Stored size in bytes
    pub size_bytes: u64,

    /// Metadata recorded at upload time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMetadata>,
}

impl fmt::Display for ObjectEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectEntry(name={}, size={})", self.name, self.size_bytes)
    }
}

/// A file handed to the pipeline by the input surface
///
/// This is the in-memory state of a selected file before it is validated,
/// queued, or uploaded.
///
/// # Examples
///
/// ```rust
/// use storefront_media::storage::SelectedFile;
///
/// let file = SelectedFile::new("logo.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47]);
/// assert_eq!(file.size(), 4);
/// assert_eq!(file.extension(), Some("png"));
/// ```
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// Original filename from the selection
    pub name: String,

    /// Declared MIME type (e.g., "image/png")
    pub media_type: String,

    /// File contents
    pub data: Bytes,
}

impl SelectedFile {
    /// Creates a new selected file
    #[must_use]
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Reads a file from disk, guessing its media type from the extension
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(format!("{} has no file name", path.display())))?
            .to_string();
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, media_type, data))
    }

    /// Returns the size of the file in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the declared media type is a raster image
    #[must_use]
    pub fn is_image(&self) -> bool {
        is_image_type(&self.media_type)
    }

    /// Extracts the file extension from the filename
    ///
    /// Returns `None` if the filename has no extension
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

/// Whether a media type string names an image
#[must_use]
pub fn is_image_type(media_type: &str) -> bool {
    media_type
        .parse::<mime::Mime>()
        .is_ok_and(|m| m.type_() == mime::IMAGE)
}
