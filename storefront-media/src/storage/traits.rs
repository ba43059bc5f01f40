//! Object storage trait definitions

use super::types::{ObjectEntry, RemoveSummary, StorageResult, UploadOptions, UploadReceipt};
use async_trait::async_trait;
use bytes::Bytes;

/// Abstraction over a bucket-oriented object storage service
///
/// The upload orchestrator and the asset registry both receive an
/// implementation of this trait at construction time, together with the
/// bucket name they operate on. Nothing in this crate reaches for a global
/// storage client.
///
/// # Implementation Requirements
///
/// Implementations must:
/// - Treat `remove` as idempotent: keys that do not exist are skipped, not errors
/// - Never silently overwrite an object when a caller supplies a fresh key
/// - Be safe to call concurrently from many tasks
///
/// # Examples
///
/// ```rust,no_run
/// use storefront_media::storage::{LocalObjectStore, ObjectStore, UploadOptions};
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = LocalObjectStore::new(PathBuf::from("/var/media"), "http://localhost:3000/media")?;
///
/// let receipt = store
///     .upload("branding", "logos/1700000000000-k3j9.png", vec![/* ... */].into(), UploadOptions::new("image/png"))
///     .await?;
/// let url = store.public_url("branding", &receipt.path);
///
/// for entry in store.list("branding").await? {
///     println!("{} -> {}", entry.name, entry.url);
/// }
///
/// store.remove("branding", &[receipt.path]).await?;
/// # let _ = url;
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `key` in `bucket`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The bucket does not exist (`StorageError::BucketNotFound`)
    /// - Credentials are rejected (`Unauthorized` / `PermissionDenied`)
    /// - The payload exceeds a service limit
    /// - The transport fails
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        options: UploadOptions,
    ) -> StorageResult<UploadReceipt>;

    /// Returns the public URL for a stored path
    ///
    /// This never touches the network; it only formats the address.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Lists every object currently in the bucket
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket is missing or the listing fails
    async fn list(&self, bucket: &str) -> StorageResult<Vec<ObjectEntry>>;

    /// Removes the given keys from the bucket
    ///
    /// Keys that are already gone count as no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend is unavailable or rejects the call
    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<RemoveSummary>;
}
