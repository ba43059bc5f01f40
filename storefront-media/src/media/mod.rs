//! Media ingestion pipeline
//!
//! Selected files flow through these stages:
//!
//! 1. [`validation`]: type and size policy, before anything is queued
//! 2. [`probe`]: natural dimensions, `0x0` for undecodable input
//! 3. [`compress`]: resize and re-encode against a [`CompressionProfile`]
//! 4. [`orchestrator`]: the queue, the per-item state machine in
//!    [`candidate`], and concurrent batch upload
//!
//! Preview images are held in a [`PreviewArena`] keyed by candidate and
//! rendered by a [`PreviewRenderer`], which the gallery reuses for remote
//! assets.

pub mod arena;
pub mod candidate;
pub mod compress;
pub mod orchestrator;
pub mod preview;
pub mod probe;
pub mod validation;

pub use arena::{PreviewArena, PreviewLocator};
pub use candidate::{AssetCandidate, CandidateId, CandidateStatus, FailureCategory};
pub use compress::{CompressedAsset, CompressionProfile, Compressor, OutputFormat};
pub use orchestrator::{BatchOutcome, BatchProgress, EnqueueReport, RejectionReason, UploadOrchestrator};
pub use preview::{PreviewRenderer, PreviewSource, PreviewState};
pub use probe::{probe, Dimensions};
pub use validation::{FileValidator, ValidationError};
