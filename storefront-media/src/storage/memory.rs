//! In-memory object storage
//!
//! A [`ObjectStore`] backed by a map, removing the need for tempdir
//! management in tests and demos. The store is [`Clone`]; clones share the
//! same buckets, so a test can keep a handle for inspection while the
//! orchestrator or registry owns another.

use super::key::validate_key;
use super::traits::ObjectStore;
use super::types::{
    ObjectEntry, ObjectMetadata, RemoveSummary, StorageError, StorageResult, UploadOptions,
    UploadReceipt,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    created_at: DateTime<Utc>,
    metadata: ObjectMetadata,
}

type Buckets = HashMap<String, BTreeMap<String, StoredObject>>;

/// Shared in-memory object store
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    buckets: Arc<Mutex<Buckets>>,
    public_base_url: String,
}

impl InMemoryObjectStore {
    /// Creates a store containing the given (empty) buckets
    #[must_use]
    pub fn with_buckets<I, S>(public_base_url: impl Into<String>, buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buckets = buckets
            .into_iter()
            .map(|b| (b.into(), BTreeMap::new()))
            .collect();
        Self {
            buckets: Arc::new(Mutex::new(buckets)),
            public_base_url: public_base_url.into(),
        }
    }

    /// Inserts an object directly, bypassing the `ObjectStore` trait
    ///
    /// Useful for seeding a gallery with a fixed creation time.
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>, created_at: DateTime<Utc>) {
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    created_at,
                    metadata: ObjectMetadata::default(),
                },
            );
    }

    /// Returns the stored bytes for a key, if present
    #[must_use]
    pub fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .lock()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| o.data.clone())
    }

    /// Number of objects in a bucket (zero when the bucket is missing)
    #[must_use]
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.lock().get(bucket).map_or(0, BTreeMap::len)
    }

    /// Whether a bucket holds no objects
    #[must_use]
    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        options: UploadOptions,
    ) -> StorageResult<UploadReceipt> {
        validate_key(key)?;
        let mut buckets = self.buckets.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        if objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                data: bytes,
                created_at: Utc::now(),
                metadata: options.metadata,
            },
        );
        Ok(UploadReceipt {
            path: key.to_string(),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.public_base_url.trim_end_matches('/'))
    }

    async fn list(&self, bucket: &str) -> StorageResult<Vec<ObjectEntry>> {
        let buckets = self.buckets.lock();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        Ok(objects
            .iter()
            .map(|(key, object)| ObjectEntry {
                name: key.clone(),
                url: self.public_url(bucket, key),
                created_at: object.created_at,
                size_bytes: object.data.len() as u64,
                metadata: Some(object.metadata.clone()),
            })
            .collect())
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<RemoveSummary> {
        let mut buckets = self.buckets.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        let deleted_count = keys.iter().filter(|k| objects.remove(k.as_str()).is_some()).count();
        Ok(RemoveSummary { deleted_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_through_trait() {
        let store = InMemoryObjectStore::with_buckets("https://cdn.example", ["branding"]);

        store
            .upload("branding", "logos/a.png", Bytes::from_static(b"abc"), UploadOptions::new("image/png"))
            .await
            .unwrap();

        assert_eq!(store.len("branding"), 1);
        let listed = store.list("branding").await.unwrap();
        assert_eq!(listed[0].url, "https://cdn.example/branding/logos/a.png");
        assert_eq!(listed[0].size_bytes, 3);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemoryObjectStore::with_buckets("https://cdn.example", ["branding"]);
        let handle = store.clone();

        store.insert("branding", "x.png", Bytes::from_static(b"x"), Utc::now());
        assert_eq!(handle.get("branding", "x.png").unwrap(), Bytes::from_static(b"x"));
    }

    #[tokio::test]
    async fn test_concurrent_remove_of_same_key() {
        let store = InMemoryObjectStore::with_buckets("https://cdn.example", ["branding"]);
        store.insert("branding", "x.png", Bytes::from_static(b"x"), Utc::now());

        let keys = vec!["x.png".to_string()];
        let (a, b) = tokio::join!(store.remove("branding", &keys), store.remove("branding", &keys));
        assert_eq!(a.unwrap().deleted_count + b.unwrap().deleted_count, 1);
        assert!(store.is_empty("branding"));
    }

    #[tokio::test]
    async fn test_missing_bucket() {
        let store = InMemoryObjectStore::with_buckets("https://cdn.example", ["branding"]);
        assert!(matches!(store.list("other").await, Err(StorageError::BucketNotFound(_))));
    }
}
