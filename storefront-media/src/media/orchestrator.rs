//! Upload queue and batch execution
//!
//! [`UploadOrchestrator`] owns the queue of [`AssetCandidate`]s. Files are
//! admitted through the validator, compressed on the blocking pool, and
//! uploaded as one concurrent batch. Each candidate settles independently:
//! one failed upload never affects its siblings, and the batch always
//! completes with whatever succeeded.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront_media::config::UploaderConfig;
//! use storefront_media::media::compress::CompressionProfile;
//! use storefront_media::media::orchestrator::UploadOrchestrator;
//! use storefront_media::storage::{InMemoryObjectStore, SelectedFile};
//!
//! # async fn example(files: Vec<SelectedFile>) {
//! let store = Arc::new(InMemoryObjectStore::with_buckets("https://cdn.test", ["branding"]));
//! let orchestrator = UploadOrchestrator::new(store, "branding", UploaderConfig::default())
//!     .with_profile(CompressionProfile::default())
//!     .on_upload_complete(|outcome| println!("uploaded {:?}", outcome.urls));
//!
//! let report = orchestrator.enqueue(files).await;
//! for rejection in &report.rejected {
//!     eprintln!("{rejection}");
//! }
//!
//! let outcome = orchestrator.start_batch().await;
//! println!("{} ok, {} failed", outcome.urls.len(), outcome.failures.len());
//! # }
//! ```

use super::arena::PreviewArena;
use super::candidate::{
    describe_failure, AssetCandidate, CandidateId, CandidateStatus, FailureCategory, InvalidTransition,
    StatusEvent,
};
use super::compress::{extension_for, CompressionProfile, Compressor};
use super::probe::{probe, Dimensions};
use super::validation::{FileValidator, ValidationError};
use crate::config::UploaderConfig;
use crate::storage::{key, ObjectStore, SelectedFile, StorageError, UploadOptions};
use futures_util::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a selected file did not enter the queue
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectionReason {
    /// Refused by the admission policy
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The queue already holds the maximum number of files
    #[error("queue is full ({max_files} files maximum)")]
    LimitReached {
        /// Configured maximum
        max_files: usize,
    },

    /// The orchestrator was torn down and takes no more files
    #[error("uploader has been shut down")]
    TornDown,
}

/// One refused file
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Name of the refused file
    pub file_name: String,
    /// Reason for refusal
    pub reason: RejectionReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectionReason::Invalid(e) => write!(f, "{e}"),
            reason => write!(f, "{}: {reason}", self.file_name),
        }
    }
}

/// Result of [`UploadOrchestrator::enqueue`]
#[derive(Debug, Clone, Default)]
pub struct EnqueueReport {
    /// Ids of the queued candidates, in selection order
    pub accepted: Vec<CandidateId>,
    /// Files that were refused
    pub rejected: Vec<Rejection>,
}

/// A failed upload within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    /// Candidate id
    pub id: CandidateId,
    /// Original file name
    pub file_name: String,
    /// Failure category
    pub category: FailureCategory,
    /// Human-readable detail
    pub detail: String,
}

/// Result of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Public URLs of the successful uploads, in completion order
    pub urls: Vec<String>,
    /// Failed uploads
    pub failures: Vec<BatchFailure>,
    /// The orchestrator was torn down before every upload settled
    pub cancelled: bool,
}

impl BatchOutcome {
    /// One line per failure, suitable for a notification
    #[must_use]
    pub fn error_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|f| format!("{}: {}", f.file_name, f.detail))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

/// Progress of the most recent batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// Candidates in the batch
    pub total: usize,
    /// Candidates that reached success or error
    pub settled: usize,
}

impl BatchProgress {
    /// Settled share in percent; an empty batch counts as complete
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = self.settled.min(self.total) * 100 / self.total;
        u8::try_from(pct).unwrap_or(100)
    }

    /// Whether every member settled
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.settled >= self.total
    }
}

type CompletionCallback = Arc<dyn Fn(&BatchOutcome) + Send + Sync>;

/// Progress of the newest batch; settles from older batches are ignored
#[derive(Debug, Default)]
struct BatchTracker {
    generation: u64,
    progress: BatchProgress,
}

impl BatchTracker {
    fn begin(&mut self, total: usize) -> u64 {
        self.generation += 1;
        self.progress = BatchProgress { total, settled: 0 };
        self.generation
    }

    fn settle(&mut self, generation: u64) {
        if generation == self.generation && self.progress.settled < self.progress.total {
            self.progress.settled += 1;
        }
    }
}

/// Owns the upload queue for one bucket
pub struct UploadOrchestrator<S: ?Sized> {
    store: Arc<S>,
    bucket: String,
    config: UploaderConfig,
    profile: CompressionProfile,
    validator: FileValidator,
    compressor: Compressor,
    arena: PreviewArena,
    queue: Arc<Mutex<Vec<AssetCandidate>>>,
    tracker: Mutex<BatchTracker>,
    on_complete: Option<CompletionCallback>,
    token: CancellationToken,
}

impl<S: ?Sized> fmt::Debug for UploadOrchestrator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("bucket", &self.bucket)
            .field("queued", &self.queue.lock().len())
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<S: ObjectStore + ?Sized> UploadOrchestrator<S> {
    /// Creates an orchestrator uploading into `bucket` of `store`
    #[must_use]
    pub fn new(store: Arc<S>, bucket: impl Into<String>, config: UploaderConfig) -> Self {
        let validator = config.validator();
        Self {
            store,
            bucket: bucket.into(),
            config,
            profile: CompressionProfile::default(),
            validator,
            compressor: Compressor::new(),
            arena: PreviewArena::new(),
            queue: Arc::new(Mutex::new(Vec::new())),
            tracker: Mutex::new(BatchTracker::default()),
            on_complete: None,
            token: CancellationToken::new(),
        }
    }

    /// Sets the profile used by automatic compression
    #[must_use]
    pub const fn with_profile(mut self, profile: CompressionProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Replaces the compressor
    #[must_use]
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// Registers the callback fired once per batch with the outcome
    #[must_use]
    pub fn on_upload_complete(mut self, callback: impl Fn(&BatchOutcome) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Arena holding the queue's preview images
    #[must_use]
    pub const fn arena(&self) -> &PreviewArena {
        &self.arena
    }

    /// Bucket this orchestrator uploads into
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Validates and queues files
    ///
    /// Accepted files become pending candidates with a preview handle and
    /// probed dimensions. Files arriving once the queue holds `max_files`
    /// candidates are refused with [`RejectionReason::LimitReached`];
    /// refused files never count toward the limit. With `auto_compress` on,
    /// a compression pass follows when an image was accepted. After
    /// [`teardown`](Self::teardown) every file is refused with
    /// [`RejectionReason::TornDown`].
    pub async fn enqueue(&self, files: impl IntoIterator<Item = SelectedFile>) -> EnqueueReport {
        let mut report = EnqueueReport::default();
        let mut accepted_image = false;

        if self.token.is_cancelled() {
            report.rejected = files
                .into_iter()
                .map(|file| Rejection {
                    file_name: file.name,
                    reason: RejectionReason::TornDown,
                })
                .collect();
            tracing::info!(rejected = report.rejected.len(), "Files refused after teardown");
            return report;
        }

        {
            let mut queue = self.queue.lock();
            for file in files {
                if let Err(e) = self.validator.validate(&file) {
                    tracing::info!(file = %file.name, reason = %e, "File rejected");
                    report.rejected.push(Rejection {
                        file_name: file.name,
                        reason: e.into(),
                    });
                    continue;
                }
                if queue.len() >= self.config.max_files {
                    tracing::info!(file = %file.name, max_files = self.config.max_files, "Queue full");
                    report.rejected.push(Rejection {
                        file_name: file.name,
                        reason: RejectionReason::LimitReached {
                            max_files: self.config.max_files,
                        },
                    });
                    continue;
                }

                let id = CandidateId::new();
                let dimensions = if file.is_image() { probe(&file.data) } else { Dimensions::zero() };
                let preview = self.arena.acquire(id, file.data.clone());
                accepted_image |= file.is_image();
                tracing::debug!(%id, file = %file.name, size = file.size(), %dimensions, "Candidate queued");

                queue.push(AssetCandidate::new(id, file, preview, dimensions));
                report.accepted.push(id);
            }
        }

        if self.config.auto_compress && accepted_image {
            self.compress_pending(&self.profile).await;
        }
        report
    }

    /// Compresses every pending image candidate
    ///
    /// Each goes `pending → compressing → pending(compressed)`. Non-image
    /// entries are skipped. Compression runs on the blocking pool; failures
    /// leave the original bytes in place. Returns the number of candidates
    /// that went through the pass.
    pub async fn compress_pending(&self, profile: &CompressionProfile) -> usize {
        let jobs: Vec<_> = {
            let mut queue = self.queue.lock();
            queue
                .iter_mut()
                .filter(|c| c.status.is_pending() && c.file.is_image())
                .filter_map(|c| {
                    c.apply(StatusEvent::CompressionStarted).ok()?;
                    Some((c.id, c.file.data.clone(), c.file.media_type.clone()))
                })
                .collect()
        };

        let mut tasks: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|(id, data, media_type)| {
                let compressor = self.compressor.clone();
                let profile = *profile;
                async move {
                    let result =
                        tokio::task::spawn_blocking(move || compressor.compress(data, &media_type, &profile)).await;
                    (id, result)
                }
            })
            .collect();

        let mut processed = 0;
        while let Some((id, result)) = tasks.next().await {
            let mut queue = self.queue.lock();
            let Some(candidate) = queue.iter_mut().find(|c| c.id == id) else {
                // Removed while compressing
                continue;
            };

            match result {
                Ok(asset) => {
                    tracing::debug!(
                        %id,
                        original = asset.original_size,
                        compressed = asset.compressed_size(),
                        fallback = asset.fallback,
                        "Compression finished"
                    );
                    if !asset.fallback {
                        let old = std::mem::replace(&mut candidate.preview, self.arena.acquire(id, asset.data.clone()));
                        self.arena.release_locator(id, &old);
                    }
                    candidate.compressed = Some(asset);
                }
                Err(e) => tracing::warn!(%id, error = %e, "Compression task failed, keeping original bytes"),
            }
            if candidate.apply(StatusEvent::CompressionFinished).is_ok() {
                processed += 1;
            }
        }
        processed
    }

    /// Uploads every pending candidate concurrently
    ///
    /// Waits until each upload settles, fires the completion callback with
    /// the successful URLs in completion order, then schedules pruning of
    /// the succeeded candidates after `prune_delay_ms`. An empty batch
    /// returns immediately without firing the callback. After
    /// [`teardown`](Self::teardown) the batch stops early and reports
    /// `cancelled`.
    pub async fn start_batch(&self) -> BatchOutcome {
        if self.token.is_cancelled() {
            return BatchOutcome {
                cancelled: true,
                ..BatchOutcome::default()
            };
        }

        let jobs: Vec<_> = {
            let mut queue = self.queue.lock();
            queue
                .iter_mut()
                .filter(|c| c.status.is_pending())
                .filter_map(|c| {
                    c.apply(StatusEvent::UploadStarted).ok()?;
                    let (data, media_type, dims) = c.payload();
                    let extension = extension_for(media_type)
                        .map(str::to_string)
                        .or_else(|| c.file.extension().map(str::to_ascii_lowercase))
                        .unwrap_or_else(|| "bin".to_string());
                    let mut options = UploadOptions::new(media_type).with_original_name(c.file.name.clone());
                    if !dims.is_zero() {
                        options = options.with_dimensions(dims.width, dims.height);
                    }
                    Some((c.id, c.file.name.clone(), data.clone(), extension, options))
                })
                .collect()
        };

        if jobs.is_empty() {
            return BatchOutcome::default();
        }

        let generation = self.tracker.lock().begin(jobs.len());
        tracing::info!(bucket = %self.bucket, batch = generation, count = jobs.len(), "Starting upload batch");

        let mut uploads: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|(id, name, data, extension, options)| {
                let key = key::generate_key(&self.config.folder, &extension);
                async move {
                    let result = self
                        .store
                        .upload(&self.bucket, &key, data, options)
                        .await
                        .map(|receipt| (self.store.public_url(&self.bucket, &receipt.path), receipt.path));
                    (id, name, result)
                }
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        loop {
            let next = match self.token.run_until_cancelled(uploads.next()).await {
                Some(Some(next)) => next,
                Some(None) => break,
                None => {
                    tracing::warn!(bucket = %self.bucket, batch = generation, "Batch abandoned after teardown");
                    outcome.cancelled = true;
                    return outcome;
                }
            };
            self.settle(generation, next, &mut outcome);
        }

        tracing::info!(
            bucket = %self.bucket,
            succeeded = outcome.urls.len(),
            failed = outcome.failures.len(),
            "Upload batch complete"
        );
        if let Some(callback) = &self.on_complete {
            callback(&outcome);
        }
        self.schedule_prune();
        outcome
    }

    fn settle(
        &self,
        generation: u64,
        (id, name, result): (CandidateId, String, Result<(String, String), StorageError>),
        outcome: &mut BatchOutcome,
    ) {
        let mut queue = self.queue.lock();
        let candidate = queue.iter_mut().find(|c| c.id == id);
        match result {
            Ok((url, key)) => {
                tracing::info!(%id, file = %name, %key, "Upload succeeded");
                if let Some(c) = candidate {
                    if let Err(e) = c.apply(StatusEvent::UploadSucceeded { url: url.clone(), key }) {
                        tracing::warn!(%id, error = %e, "Upload result not recorded");
                    }
                }
                outcome.urls.push(url);
            }
            Err(e) => {
                let detail = describe_failure(&e);
                tracing::warn!(%id, file = %name, error = %e, "Upload failed");
                if let Some(c) = candidate {
                    if let Err(e) = c.apply(StatusEvent::UploadFailed { detail: detail.clone() }) {
                        tracing::warn!(%id, error = %e, "Upload failure not recorded");
                    }
                }
                outcome.failures.push(BatchFailure {
                    id,
                    file_name: name,
                    category: FailureCategory::of(&e),
                    detail,
                });
            }
        }
        drop(queue);
        self.tracker.lock().settle(generation);
    }

    fn schedule_prune(&self) {
        let queue = Arc::clone(&self.queue);
        let arena = self.arena.clone();
        let token = self.token.clone();
        let delay = Duration::from_millis(self.config.prune_delay_ms);

        tokio::spawn(async move {
            if token.run_until_cancelled(tokio::time::sleep(delay)).await.is_none() {
                return;
            }
            let mut queue = queue.lock();
            let before = queue.len();
            queue.retain(|c| {
                let done = matches!(c.status, CandidateStatus::Success { .. });
                if done {
                    arena.release(c.id);
                }
                !done
            });
            tracing::debug!(pruned = before - queue.len(), "Pruned uploaded candidates");
        });
    }

    /// Removes one candidate and releases its previews
    ///
    /// Works in any status. Removing an uploading candidate does not abort
    /// its in-flight call. Returns `false` for an unknown id.
    pub fn remove(&self, id: CandidateId) -> bool {
        let mut queue = self.queue.lock();
        let Some(index) = queue.iter().position(|c| c.id == id) else {
            return false;
        };
        queue.remove(index);
        self.arena.release(id);
        tracing::debug!(%id, "Candidate removed");
        true
    }

    /// Removes every candidate; returns how many were removed
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.queue.lock().drain(..).collect();
        for candidate in &drained {
            self.arena.release(candidate.id);
        }
        drained.len()
    }

    /// Resets a failed candidate to pending
    ///
    /// Returns `Ok(false)` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the candidate is not in `error`.
    pub fn retry(&self, id: CandidateId) -> Result<bool, InvalidTransition> {
        let mut queue = self.queue.lock();
        let Some(candidate) = queue.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        candidate.apply(StatusEvent::Retry)?;
        tracing::debug!(%id, "Candidate reset for retry");
        Ok(true)
    }

    /// Copy of the queue in insertion order
    #[must_use]
    pub fn snapshot(&self) -> Vec<AssetCandidate> {
        self.queue.lock().clone()
    }

    /// Number of queued candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Progress of the most recent batch
    ///
    /// A batch started while an earlier one is still running replaces it
    /// here; the earlier batch's settles no longer count.
    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        self.tracker.lock().progress
    }

    /// Releases every preview, clears the queue and cancels in-flight work
    ///
    /// Uploads already sent to the store may still land; their results are
    /// no longer recorded. The orchestrator accepts no further files or
    /// batches.
    pub fn teardown(&self) {
        self.token.cancel();
        let removed = self.clear();
        let released = self.arena.release_all();
        tracing::debug!(removed, released, "Orchestrator torn down");
    }
}
