//! Testing utilities
//!
//! Fixtures for exercising the pipeline without real photos or a real
//! storage service:
//! - [`png_bytes`] / [`jpeg_bytes`] encode solid-colour images of any size
//! - [`FaultyObjectStore`] wraps another store and fails chosen uploads
//!
//! # Example
//!
//! ```rust
//! use storefront_media::storage::{InMemoryObjectStore, SelectedFile};
//! use storefront_media::testing::{png_bytes, FaultyObjectStore};
//!
//! let inner = InMemoryObjectStore::with_buckets("https://cdn.test", ["branding"]);
//! let store = FaultyObjectStore::new(inner).fail_uploads_named(["broken.png"]);
//! let file = SelectedFile::new("ok.png", "image/png", png_bytes(4, 4));
//! # let _ = (store, file);
//! ```

use crate::storage::{
    ObjectEntry, ObjectStore, RemoveSummary, StorageError, StorageResult, UploadOptions,
    UploadReceipt,
};
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn solid(width: u32, height: u32) -> DynamicImage {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    DynamicImage::ImageRgb8(img)
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    // Encoding an in-memory RGB buffer to PNG/JPEG cannot fail
    let _ = solid(width, height).write_to(&mut Cursor::new(&mut buffer), format);
    buffer
}

/// Encodes a `width`×`height` PNG
#[must_use]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Png)
}

/// Encodes a `width`×`height` JPEG
#[must_use]
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}

/// Object store wrapper that injects upload failures
///
/// Uploads whose original file name (from [`UploadOptions`] metadata) is in
/// the configured set fail with a network error; every other call is
/// forwarded. An optional delay makes uploads overlap in time so tests can
/// observe concurrency.
#[derive(Debug, Clone)]
pub struct FaultyObjectStore<S> {
    inner: S,
    failing_names: Arc<Mutex<HashSet<String>>>,
    upload_delay: Option<Duration>,
    failure: fn(&str) -> StorageError,
}

fn network_failure(name: &str) -> StorageError {
    StorageError::Network(format!("connection reset while sending {name}"))
}

impl<S> FaultyObjectStore<S> {
    /// Wraps a store without any injected failures
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_names: Arc::new(Mutex::new(HashSet::new())),
            upload_delay: None,
            failure: network_failure,
        }
    }

    /// Makes uploads of the given original file names fail
    #[must_use]
    pub fn fail_uploads_named<I, N>(self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.failing_names.lock().extend(names.into_iter().map(Into::into));
        self
    }

    /// Chooses the error produced for failing uploads
    #[must_use]
    pub fn with_failure(mut self, failure: fn(&str) -> StorageError) -> Self {
        self.failure = failure;
        self
    }

    /// Delays every upload by `delay`
    #[must_use]
    pub const fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Stops failing uploads for `name`
    pub fn heal(&self, name: &str) {
        self.failing_names.lock().remove(name);
    }

    /// The wrapped store
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for FaultyObjectStore<S> {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        options: UploadOptions,
    ) -> StorageResult<UploadReceipt> {
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        let name = options.metadata.original_name.clone().unwrap_or_default();
        if self.failing_names.lock().contains(&name) {
            return Err((self.failure)(&name));
        }
        self.inner.upload(bucket, key, bytes, options).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public_url(bucket, path)
    }

    async fn list(&self, bucket: &str) -> StorageResult<Vec<ObjectEntry>> {
        self.inner.list(bucket).await
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<RemoveSummary> {
        self.inner.remove(bucket, keys).await
    }
}
