//! Queued upload candidates and their state machine

use super::arena::PreviewLocator;
use super::compress::CompressedAsset;
use super::probe::Dimensions;
use crate::storage::{SelectedFile, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Identity of a queued candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(Uuid);

impl CandidateId {
    /// Generates a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Upload status of a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CandidateStatus {
    /// Waiting for compression or upload
    Pending {
        /// Whether a compression pass already produced bytes
        compressed: bool,
    },
    /// Compression pass in progress
    Compressing,
    /// Upload call in flight
    Uploading,
    /// Stored successfully
    Success {
        /// Public URL of the stored object
        url: String,
        /// Storage key
        key: String,
    },
    /// Upload failed
    Error {
        /// Human-readable failure description
        detail: String,
    },
}

impl CandidateStatus {
    /// Whether the candidate settled (success or error)
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error { .. })
    }

    /// Whether the candidate waits in the queue
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Short lowercase name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Compressing => "compressing",
            Self::Uploading => "uploading",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { detail } => write!(f, "error: {detail}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Input to [`transition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A compression pass picked the candidate up
    CompressionStarted,
    /// The compression pass finished (with or without fallback)
    CompressionFinished,
    /// The batch issued the upload call
    UploadStarted,
    /// The store accepted the object
    UploadSucceeded {
        /// Public URL
        url: String,
        /// Storage key
        key: String,
    },
    /// The store rejected the object or the call failed
    UploadFailed {
        /// Human-readable failure description
        detail: String,
    },
    /// Explicit external reset of a failed candidate
    Retry,
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition from {from} on {event}")]
pub struct InvalidTransition {
    /// Status name before the event
    pub from: &'static str,
    /// Event name
    pub event: &'static str,
}

impl StatusEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::CompressionStarted => "compression-started",
            Self::CompressionFinished => "compression-finished",
            Self::UploadStarted => "upload-started",
            Self::UploadSucceeded { .. } => "upload-succeeded",
            Self::UploadFailed { .. } => "upload-failed",
            Self::Retry => "retry",
        }
    }
}

/// Applies an event to a status
///
/// ```text
/// pending → compressing → pending(compressed)
/// pending → uploading → success | error
/// error → pending (retry only)
/// ```
///
/// An empty failure detail is replaced so `error` always carries a message.
///
/// # Errors
///
/// Returns [`InvalidTransition`] for any other combination.
pub fn transition(
    current: &CandidateStatus,
    event: StatusEvent,
) -> Result<CandidateStatus, InvalidTransition> {
    use CandidateStatus as S;
    use StatusEvent as E;

    match (current, event) {
        (S::Pending { .. }, E::CompressionStarted) => Ok(S::Compressing),
        (S::Compressing, E::CompressionFinished) => Ok(S::Pending { compressed: true }),
        (S::Pending { .. }, E::UploadStarted) => Ok(S::Uploading),
        (S::Uploading, E::UploadSucceeded { url, key }) => Ok(S::Success { url, key }),
        (S::Uploading, E::UploadFailed { detail }) => Ok(S::Error {
            detail: if detail.trim().is_empty() {
                "upload failed".to_string()
            } else {
                detail
            },
        }),
        (S::Error { .. }, E::Retry) => Ok(S::Pending { compressed: false }),
        (from, event) => Err(InvalidTransition {
            from: from.name(),
            event: event.name(),
        }),
    }
}

/// Category of an upload failure shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCategory {
    /// Missing or rejected credentials
    Authentication,
    /// Operation not permitted
    Permission,
    /// Target bucket absent
    BucketMissing,
    /// Object too large for the service
    Size,
    /// Transport failure
    Network,
    /// Anything else
    Other,
}

impl FailureCategory {
    /// Classifies a storage error
    #[must_use]
    pub fn of(error: &StorageError) -> Self {
        match error {
            StorageError::Unauthorized(_) => Self::Authentication,
            StorageError::PermissionDenied(_) => Self::Permission,
            StorageError::BucketNotFound(_) => Self::BucketMissing,
            StorageError::PayloadTooLarge { .. } | StorageError::QuotaExceeded => Self::Size,
            StorageError::Network(_) => Self::Network,
            StorageError::Other(message) => Self::classify(message),
            _ => Self::Other,
        }
    }

    /// Classifies a raw service message by keyword
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["jwt", "unauthorized", "token", "401"]) {
            Self::Authentication
        } else if has(&["permission", "policy", "forbidden", "403"]) {
            Self::Permission
        } else if has(&["bucket"]) && has(&["not found", "missing", "does not exist"]) {
            Self::BucketMissing
        } else if has(&["too large", "size", "413", "quota"]) {
            Self::Size
        } else if has(&["network", "fetch", "connection", "timed out", "timeout"]) {
            Self::Network
        } else {
            Self::Other
        }
    }

    /// User-facing sentence for the category
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Authentication => "Authentication failed. Sign in again and retry.",
            Self::Permission => "You do not have permission to upload to this bucket.",
            Self::BucketMissing => "The storage bucket does not exist.",
            Self::Size => "The file is too large for the storage service.",
            Self::Network => "Network error while uploading. Check the connection and retry.",
            Self::Other => "Upload failed.",
        }
    }
}

/// Human-readable detail for a failed upload
///
/// Unclassified errors keep the raw message so nothing is lost.
#[must_use]
pub fn describe_failure(error: &StorageError) -> String {
    match FailureCategory::of(error) {
        FailureCategory::Other => format!("{} {error}", FailureCategory::Other.message()),
        category => category.message().to_string(),
    }
}

/// One file in the upload queue
#[derive(Debug, Clone)]
pub struct AssetCandidate {
    /// Queue identity
    pub id: CandidateId,
    /// Selected file as validated
    pub file: SelectedFile,
    /// Locator of the preview image
    pub preview: PreviewLocator,
    /// Natural dimensions of the original bytes
    pub dimensions: Dimensions,
    /// Result of the last compression pass
    pub compressed: Option<CompressedAsset>,
    /// Current status
    pub status: CandidateStatus,
    /// Upload progress in `[0, 100]`
    pub progress: u8,
}

impl AssetCandidate {
    /// Creates a pending candidate
    #[must_use]
    pub fn new(id: CandidateId, file: SelectedFile, preview: PreviewLocator, dimensions: Dimensions) -> Self {
        Self {
            id,
            file,
            preview,
            dimensions,
            compressed: None,
            status: CandidateStatus::Pending { compressed: false },
            progress: 0,
        }
    }

    /// Applies an event, updating progress alongside the status
    ///
    /// Progress never decreases while uploading and reaches 100 on success.
    /// A retry clears progress but keeps the compression result, so the
    /// next attempt sends the same bytes as the failed one.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] and leaves the candidate untouched when
    /// the event is not allowed.
    pub fn apply(&mut self, event: StatusEvent) -> Result<(), InvalidTransition> {
        let retry = event == StatusEvent::Retry;
        let mut next = transition(&self.status, event)?;
        match &mut next {
            CandidateStatus::Success { .. } => self.progress = 100,
            CandidateStatus::Uploading => self.progress = self.progress.max(10),
            CandidateStatus::Pending { compressed } if retry => {
                self.progress = 0;
                *compressed = self.compressed.is_some();
            }
            _ => {}
        }
        self.status = next;
        Ok(())
    }

    /// Bytes to send: compressed output when present, else the original
    #[must_use]
    pub fn payload(&self) -> (&bytes::Bytes, &str, Dimensions) {
        match &self.compressed {
            Some(c) if !c.fallback => (&c.data, c.media_type.as_str(), c.dimensions),
            _ => (&self.file.data, self.file.media_type.as_str(), self.dimensions),
        }
    }

    /// Size of the original file
    #[must_use]
    pub fn original_size(&self) -> u64 {
        self.file.size()
    }

    /// Size of the compressed output, if compression ran
    #[must_use]
    pub fn compressed_size(&self) -> Option<u64> {
        self.compressed.as_ref().map(CompressedAsset::compressed_size)
    }

    /// Error detail when the upload failed
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            CandidateStatus::Error { detail } => Some(detail),
            _ => None,
        }
    }

    /// Public URL when the upload succeeded
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.status {
            CandidateStatus::Success { url, .. } => Some(url),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn pending() -> CandidateStatus {
        CandidateStatus::Pending { compressed: false }
    }

    fn candidate() -> AssetCandidate {
        AssetCandidate::new(
            CandidateId::new(),
            SelectedFile::new("a.png", "image/png", vec![1, 2, 3]),
            PreviewLocator::new("local-preview://x"),
            Dimensions::new(2, 2),
        )
    }

    #[test]
    fn test_compression_round_trip() {
        let s = transition(&pending(), StatusEvent::CompressionStarted).unwrap();
        assert_eq!(s, CandidateStatus::Compressing);
        let s = transition(&s, StatusEvent::CompressionFinished).unwrap();
        assert_eq!(s, CandidateStatus::Pending { compressed: true });
    }

    #[test]
    fn test_upload_paths() {
        let uploading = transition(&pending(), StatusEvent::UploadStarted).unwrap();
        let ok = transition(
            &uploading,
            StatusEvent::UploadSucceeded { url: "u".into(), key: "k".into() },
        )
        .unwrap();
        assert!(ok.is_terminal());

        let failed = transition(&uploading, StatusEvent::UploadFailed { detail: "boom".into() }).unwrap();
        assert_eq!(failed, CandidateStatus::Error { detail: "boom".into() });
    }

    #[test]
    fn test_error_always_carries_detail() {
        let failed = transition(&CandidateStatus::Uploading, StatusEvent::UploadFailed { detail: "  ".into() })
            .unwrap();
        match failed {
            CandidateStatus::Error { detail } => assert!(!detail.trim().is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let success = CandidateStatus::Success { url: "u".into(), key: "k".into() };
        let cases = [
            (pending(), StatusEvent::CompressionFinished),
            (pending(), StatusEvent::Retry),
            (CandidateStatus::Compressing, StatusEvent::UploadStarted),
            (CandidateStatus::Uploading, StatusEvent::CompressionStarted),
            (CandidateStatus::Uploading, StatusEvent::Retry),
            (success.clone(), StatusEvent::UploadStarted),
            (success, StatusEvent::Retry),
            (
                CandidateStatus::Error { detail: "x".into() },
                StatusEvent::UploadStarted,
            ),
        ];
        for (from, event) in cases {
            assert!(transition(&from, event).is_err(), "{from:?} accepted an invalid event");
        }
    }

    #[test]
    fn test_retry_resets_error() {
        let mut c = candidate();
        c.apply(StatusEvent::UploadStarted).unwrap();
        c.apply(StatusEvent::UploadFailed { detail: "net".into() }).unwrap();
        assert_eq!(c.error(), Some("net"));

        c.apply(StatusEvent::Retry).unwrap();
        assert_eq!(c.status, pending());
        assert_eq!(c.progress, 0);
    }

    #[test]
    fn test_retry_keeps_compressed_payload() {
        let mut c = candidate();
        c.apply(StatusEvent::CompressionStarted).unwrap();
        c.compressed = Some(CompressedAsset {
            data: Bytes::from_static(b"small"),
            media_type: "image/png".into(),
            dimensions: Dimensions::new(1, 1),
            original_size: 3,
            fallback: false,
        });
        c.apply(StatusEvent::CompressionFinished).unwrap();
        c.apply(StatusEvent::UploadStarted).unwrap();
        c.apply(StatusEvent::UploadFailed { detail: "net".into() }).unwrap();

        c.apply(StatusEvent::Retry).unwrap();
        assert_eq!(c.status, CandidateStatus::Pending { compressed: true });
        let (data, _, dims) = c.payload();
        assert_eq!(data.as_ref(), b"small");
        assert_eq!(dims, Dimensions::new(1, 1));
    }

    #[test]
    fn test_progress_reaches_100_on_success() {
        let mut c = candidate();
        c.apply(StatusEvent::UploadStarted).unwrap();
        assert!(c.progress > 0);
        c.apply(StatusEvent::UploadSucceeded { url: "https://x/a.png".into(), key: "a.png".into() })
            .unwrap();
        assert_eq!(c.progress, 100);
        assert_eq!(c.url(), Some("https://x/a.png"));
    }

    #[test]
    fn test_failed_apply_leaves_candidate_untouched() {
        let mut c = candidate();
        assert!(c.apply(StatusEvent::Retry).is_err());
        assert_eq!(c.status, pending());
    }

    #[test]
    fn test_payload_prefers_compressed_bytes() {
        let mut c = candidate();
        assert_eq!(c.payload().0.as_ref(), &[1, 2, 3]);

        c.compressed = Some(CompressedAsset {
            data: Bytes::from_static(b"jpg"),
            media_type: "image/jpeg".into(),
            dimensions: Dimensions::new(1, 1),
            original_size: 3,
            fallback: false,
        });
        let (data, media_type, dims) = c.payload();
        assert_eq!(data.as_ref(), b"jpg");
        assert_eq!(media_type, "image/jpeg");
        assert_eq!(dims, Dimensions::new(1, 1));
    }

    #[test]
    fn test_failure_categories() {
        assert_eq!(
            FailureCategory::of(&StorageError::Unauthorized("x".into())),
            FailureCategory::Authentication
        );
        assert_eq!(
            FailureCategory::of(&StorageError::PayloadTooLarge { actual: 2, limit: 1 }),
            FailureCategory::Size
        );
        assert_eq!(
            FailureCategory::of(&StorageError::Other("new row violates row-level security policy".into())),
            FailureCategory::Permission
        );
        assert_eq!(
            FailureCategory::of(&StorageError::Other("Bucket not found".into())),
            FailureCategory::BucketMissing
        );
        assert_eq!(FailureCategory::classify("Failed to fetch"), FailureCategory::Network);
        assert_eq!(FailureCategory::classify("teapot"), FailureCategory::Other);
    }

    #[test]
    fn test_describe_failure_keeps_raw_message_for_other() {
        let detail = describe_failure(&StorageError::Other("teapot".into()));
        assert!(detail.contains("teapot"));

        let detail = describe_failure(&StorageError::Network("reset".into()));
        assert!(detail.starts_with("Network error"));
    }
}
