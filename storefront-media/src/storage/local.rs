//! Local filesystem object storage implementation

use super::key::validate_key;
use super::traits::ObjectStore;
use super::types::{
    ObjectEntry, ObjectMetadata, RemoveSummary, StorageError, StorageResult, UploadOptions,
    UploadReceipt,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Name of the per-bucket directory holding metadata sidecars
const META_DIR: &str = ".meta";

/// Name of the per-bucket directory holding uploads still being written
const STAGING_DIR: &str = ".staging";

/// Sidecar record written next to every object
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sidecar {
    created_at: DateTime<Utc>,
    #[serde(default)]
    metadata: ObjectMetadata,
}

/// Local filesystem storage backend
///
/// Each bucket is a directory under the root; object keys map directly to
/// relative paths inside it. Metadata lives in a hidden sidecar tree so
/// listings never confuse it with objects.
///
/// # Directory Structure
///
/// ```text
/// /var/media/
/// └── branding/
///     ├── logos/
///     │   └── 1700000000000-k3j9x0a1bc.png
///     └── .meta/
///         └── logos/
///             └── 1700000000000-k3j9x0a1bc.png.json
/// ```
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    /// Root directory containing one directory per bucket
    root: PathBuf,

    /// Base URL under which the root is served
    public_base_url: String,
}

impl LocalObjectStore {
    /// Creates a new local object store
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if the root exists and is not a directory
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> StorageResult<Self> {
        if root.exists() && !root.is_dir() {
            return Err(StorageError::InvalidKey(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        Ok(Self {
            root,
            public_base_url: public_base_url.into(),
        })
    }

    /// Creates the bucket directory if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket name is invalid or the directory cannot be created
    pub async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        validate_bucket(bucket)?;
        fs::create_dir_all(self.bucket_dir(bucket)).await?;
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_dir(bucket).join(key)
    }

    fn sidecar_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_dir(bucket).join(META_DIR).join(format!("{key}.json"))
    }

    async fn existing_bucket(&self, bucket: &str) -> StorageResult<PathBuf> {
        validate_bucket(bucket)?;
        let dir = self.bucket_dir(bucket);
        if fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
            Ok(dir)
        } else {
            Err(StorageError::BucketNotFound(bucket.to_string()))
        }
    }

    async fn read_sidecar(&self, bucket: &str, key: &str) -> Option<Sidecar> {
        let raw = fs::read_to_string(self.sidecar_path(bucket, key)).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                tracing::warn!(bucket, key, error = %e, "Ignoring unreadable metadata sidecar");
                None
            }
        }
    }

    /// Writes `bytes` to `staged`, links it to `path`, then writes the sidecar
    ///
    /// The hard link fails when `path` exists, so a key is never reused. If
    /// the sidecar cannot be written the linked object is removed again.
    async fn commit(
        &self,
        bucket: &str,
        key: &str,
        staged: &Path,
        path: &Path,
        bytes: &Bytes,
        options: UploadOptions,
    ) -> StorageResult<()> {
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut f = fs::File::create(staged).await?;
        f.write_all(bytes).await?;
        f.flush().await?;
        drop(f);

        match fs::hard_link(staged, path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let sidecar = Sidecar {
            created_at: Utc::now(),
            metadata: options.metadata,
        };
        if let Err(e) = self.write_sidecar(bucket, key, &sidecar).await {
            if let Err(cleanup) = fs::remove_file(path).await {
                tracing::warn!(bucket, key, error = %cleanup, "Failed to remove partially stored object");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn write_sidecar(&self, bucket: &str, key: &str, sidecar: &Sidecar) -> StorageResult<()> {
        let sidecar_path = self.sidecar_path(bucket, key);
        if let Some(parent) = sidecar_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(sidecar)
            .map_err(|e| StorageError::Other(format!("Failed to serialize metadata: {e}")))?;
        fs::write(&sidecar_path, json).await?;
        Ok(())
    }

    /// Collects every object key below `dir`, skipping hidden entries
    async fn collect_keys(dir: &Path) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(dir.to_path_buf(), String::new())];

        while let Some((current, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let key = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), key));
                } else if file_type.is_file() {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() || bucket.contains('/') || bucket.starts_with('.') {
        return Err(StorageError::InvalidKey(format!("invalid bucket name: {bucket}")));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        options: UploadOptions,
    ) -> StorageResult<UploadReceipt> {
        self.existing_bucket(bucket).await?;
        validate_key(key)?;

        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Bytes are staged in a hidden file and only linked into place once
        // complete, so a failed write never leaves a listable object behind.
        let staged = self.bucket_dir(bucket).join(STAGING_DIR).join(Uuid::new_v4().to_string());
        let result = self.commit(bucket, key, &staged, &path, &bytes, options).await;
        if let Err(e) = fs::remove_file(&staged).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(bucket, key, error = %e, "Failed to remove staged upload");
            }
        }
        result?;

        tracing::debug!(bucket, key, size = bytes.len(), "Stored object");
        Ok(UploadReceipt {
            path: key.to_string(),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            bucket,
            path.trim_start_matches('/')
        )
    }

    async fn list(&self, bucket: &str) -> StorageResult<Vec<ObjectEntry>> {
        let dir = self.existing_bucket(bucket).await?;
        let keys = Self::collect_keys(&dir).await?;

        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            let meta = match fs::metadata(self.object_path(bucket, &key)).await {
                Ok(meta) => meta,
                // Removed by a concurrent session between read_dir and stat
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let sidecar = self.read_sidecar(bucket, &key).await;
            let created_at = sidecar.as_ref().map_or_else(
                || meta.modified().map_or_else(|_| Utc::now(), DateTime::<Utc>::from),
                |s| s.created_at,
            );

            objects.push(ObjectEntry {
                url: self.public_url(bucket, &key),
                name: key,
                created_at,
                size_bytes: meta.len(),
                metadata: sidecar.map(|s| s.metadata),
            });
        }

        Ok(objects)
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<RemoveSummary> {
        self.existing_bucket(bucket).await?;

        let mut summary = RemoveSummary::default();
        for key in keys {
            validate_key(key)?;

            // Idempotent - a key that is already gone is not an error
            match fs::remove_file(self.object_path(bucket, key)).await {
                Ok(()) => summary.deleted_count += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(bucket, key = %key, "Object already absent");
                }
                Err(e) => return Err(e.into()),
            }
            match fs::remove_file(self.sidecar_path(bucket, key)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (LocalObjectStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            LocalObjectStore::new(temp_dir.path().to_path_buf(), "http://localhost:3000/media/")
                .unwrap();
        store.ensure_bucket("branding").await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_upload_and_list() {
        let (store, _temp) = create_test_store().await;

        let options = UploadOptions::new("image/png")
            .with_dimensions(32, 16)
            .with_original_name("logo.png");
        let receipt = store
            .upload("branding", "logos/1-abc.png", Bytes::from_static(b"png!"), options)
            .await
            .unwrap();
        assert_eq!(receipt.path, "logos/1-abc.png");

        let listed = store.list("branding").await.unwrap();
        assert_eq!(listed.len(), 1);
        let entry = &listed[0];
        assert_eq!(entry.name, "logos/1-abc.png");
        assert_eq!(entry.size_bytes, 4);
        assert_eq!(entry.url, "http://localhost:3000/media/branding/logos/1-abc.png");
        let metadata = entry.metadata.as_ref().unwrap();
        assert_eq!(metadata.width, Some(32));
        assert_eq!(metadata.mime.as_deref(), Some("image/png"));
        assert_eq!(metadata.original_name.as_deref(), Some("logo.png"));
    }

    #[tokio::test]
    async fn test_upload_never_overwrites() {
        let (store, temp) = create_test_store().await;

        store
            .upload("branding", "a.png", Bytes::from_static(b"one"), UploadOptions::new("image/png"))
            .await
            .unwrap();
        let second = store
            .upload("branding", "a.png", Bytes::from_static(b"second"), UploadOptions::new("image/png"))
            .await;
        assert!(matches!(second, Err(StorageError::AlreadyExists(_))));

        let stored = tokio::fs::read(temp.path().join("branding/a.png")).await.unwrap();
        assert_eq!(stored, b"one");
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_nothing_behind() {
        let (store, temp) = create_test_store().await;
        // a plain file where the sidecar directory belongs makes the metadata write fail
        tokio::fs::write(temp.path().join("branding").join(META_DIR), b"x").await.unwrap();

        let upload = store
            .upload("branding", "a.png", Bytes::from_static(b"png!"), UploadOptions::new("image/png"))
            .await;
        assert!(upload.is_err());

        assert!(!temp.path().join("branding/a.png").exists());
        assert!(store.list("branding").await.unwrap().is_empty());
        let mut staged = tokio::fs::read_dir(temp.path().join("branding").join(STAGING_DIR)).await.unwrap();
        assert!(staged.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_bucket() {
        let (store, _temp) = create_test_store().await;

        let upload = store
            .upload("nope", "a.png", Bytes::new(), UploadOptions::new("image/png"))
            .await;
        assert!(matches!(upload, Err(StorageError::BucketNotFound(_))));
        assert!(matches!(store.list("nope").await, Err(StorageError::BucketNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, _temp) = create_test_store().await;

        store
            .upload("branding", "slides/a.jpg", Bytes::from_static(b"a"), UploadOptions::new("image/jpeg"))
            .await
            .unwrap();

        let keys = vec!["slides/a.jpg".to_string()];
        let first = store.remove("branding", &keys).await.unwrap();
        assert_eq!(first.deleted_count, 1);

        let second = store.remove("branding", &keys).await.unwrap();
        assert_eq!(second.deleted_count, 0);
        assert!(store.list("branding").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let (store, _temp) = create_test_store().await;

        let result = store
            .upload("branding", "../escape.png", Bytes::new(), UploadOptions::new("image/png"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_list_without_sidecar_falls_back_to_mtime() {
        let (store, temp) = create_test_store().await;

        std::fs::write(temp.path().join("branding").join("manual.gif"), b"gif").unwrap();

        let listed = store.list("branding").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "manual.gif");
        assert!(listed[0].metadata.is_none());
    }

    #[tokio::test]
    async fn test_invalid_root() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("not-a-directory");
        std::fs::write(&file_path, b"test").unwrap();

        let result = LocalObjectStore::new(file_path, "http://localhost");
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
