//! Where the gallery reads and deletes assets
//!
//! [`BucketAssets`] talks to an [`ObjectStore`] directly;
//! [`HttpAssetSource`] goes through the JSON API served by
//! [`crate::http::routes`].

use super::asset::RemoteAsset;
use crate::http::{BulkDeleteRequest, DeleteRequest, DeleteResponse, ImagesResponse};
use crate::storage::{ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Listing and deletion of persisted assets
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Every asset in the namespace
    async fn list(&self) -> StorageResult<Vec<RemoteAsset>>;

    /// Deletes keys, skipping ones that do not exist
    ///
    /// Returns how many keys were removed.
    async fn delete(&self, keys: &[String]) -> StorageResult<usize>;
}

/// Asset source backed by one bucket of an object store
pub struct BucketAssets<S: ?Sized> {
    store: Arc<S>,
    bucket: String,
}

impl<S: ?Sized> BucketAssets<S> {
    /// Wraps `bucket` of `store`
    #[must_use]
    pub fn new(store: Arc<S>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for BucketAssets<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketAssets")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: ObjectStore + ?Sized> AssetSource for BucketAssets<S> {
    async fn list(&self) -> StorageResult<Vec<RemoteAsset>> {
        let entries = self.store.list(&self.bucket).await?;
        Ok(entries.into_iter().map(RemoteAsset::from).collect())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<usize> {
        Ok(self.store.remove(&self.bucket, keys).await?.deleted_count)
    }
}

/// Asset source reaching the gallery API over HTTP
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetSource {
    /// Creates a source for the API rooted at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a source using a preconfigured client
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn read_delete(response: reqwest::Response) -> StorageResult<usize> {
    let body: DeleteResponse = response.error_for_status()?.json().await?;
    if body.success {
        Ok(body.deleted.unwrap_or(0))
    } else {
        Err(StorageError::Other(body.error.unwrap_or_else(|| "delete failed".to_string())))
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn list(&self) -> StorageResult<Vec<RemoteAsset>> {
        let body: ImagesResponse = self
            .client
            .get(self.url("/images"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if body.success {
            Ok(body.images)
        } else {
            Err(StorageError::Other(body.error.unwrap_or_else(|| "listing failed".to_string())))
        }
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<usize> {
        let response = match keys {
            [] => return Ok(0),
            [key] => {
                self.client
                    .delete(self.url("/images"))
                    .json(&DeleteRequest { file_name: key.clone() })
                    .send()
                    .await?
            }
            _ => {
                self.client
                    .post(self.url("/images/delete"))
                    .json(&BulkDeleteRequest { file_names: keys.to_vec() })
                    .send()
                    .await?
            }
        };
        read_delete(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryObjectStore, ObjectMetadata, UploadOptions};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_bucket_assets_maps_entries() {
        let store = Arc::new(InMemoryObjectStore::with_buckets("https://cdn.test", ["b"]));
        store
            .upload(
                "b",
                "logos/a.png",
                Bytes::from_static(b"png"),
                UploadOptions::new("image/png").with_dimensions(4, 2),
            )
            .await
            .unwrap();

        let source = BucketAssets::new(Arc::clone(&store), "b");
        let assets = source.list().await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].name(), "a.png");
        assert_eq!(assets[0].url, "https://cdn.test/b/logos/a.png");
        assert_eq!((assets[0].width, assets[0].height), (Some(4), Some(2)));
        assert_eq!(assets[0].size_bytes, 3);

        assert_eq!(source.delete(&["logos/a.png".to_string(), "x.png".to_string()]).await.unwrap(), 1);
        assert_eq!(source.delete(&["logos/a.png".to_string()]).await.unwrap(), 0);
    }

    #[test]
    fn test_metadata_defaults_when_absent() {
        let asset = RemoteAsset::from(crate::storage::ObjectEntry {
            name: "x.png".into(),
            url: "u".into(),
            created_at: chrono::Utc::now(),
            size_bytes: 1,
            metadata: None,
        });
        assert_eq!(asset.mime, ObjectMetadata::default().mime);
        assert!(asset.width.is_none());
    }

    #[test]
    fn test_http_source_trims_base_url() {
        let source = HttpAssetSource::new("http://localhost:3000/");
        assert_eq!(source.url("/images"), "http://localhost:3000/images");
    }
}
