//! Session-local preview resources
//!
//! Every preview handle created for a queued candidate is registered here
//! under the candidate's id and stays alive until it is explicitly released
//! (item removal, batch pruning, or teardown). Nothing depends on when the
//! allocator happens to reclaim memory.

use super::candidate::CandidateId;
use super::preview::{PreviewError, PreviewSource};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Scheme prefix of locally generated preview locators
pub const LOCAL_SCHEME: &str = "local-preview://";

/// Address of a preview image, local or remote
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewLocator(String);

impl PreviewLocator {
    /// Wraps an arbitrary locator (for example a remote asset URL)
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    fn fresh_local() -> Self {
        Self(format!("{LOCAL_SCHEME}{}", Uuid::new_v4()))
    }

    /// Whether the locator points into a preview arena
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_SCHEME)
    }

    /// The locator string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct ArenaState {
    // Locators owned by each candidate (original preview, compressed preview)
    owners: HashMap<CandidateId, Vec<PreviewLocator>>,
    data: HashMap<PreviewLocator, Bytes>,
}

/// Arena of preview handles keyed by candidate id
///
/// Cloning the arena yields another handle to the same storage.
#[derive(Debug, Clone, Default)]
pub struct PreviewArena {
    state: Arc<Mutex<ArenaState>>,
}

impl PreviewArena {
    /// Creates an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers preview bytes for a candidate and returns their locator
    pub fn acquire(&self, owner: CandidateId, data: Bytes) -> PreviewLocator {
        let locator = PreviewLocator::fresh_local();
        let mut state = self.state.lock();
        state.data.insert(locator.clone(), data);
        state.owners.entry(owner).or_default().push(locator.clone());
        tracing::trace!(%owner, %locator, "Acquired preview handle");
        locator
    }

    /// Releases a single locator owned by `owner`
    ///
    /// Returns `true` if the handle was live.
    pub fn release_locator(&self, owner: CandidateId, locator: &PreviewLocator) -> bool {
        let mut state = self.state.lock();
        if let Some(owned) = state.owners.get_mut(&owner) {
            owned.retain(|l| l != locator);
            if owned.is_empty() {
                state.owners.remove(&owner);
            }
        }
        state.data.remove(locator).is_some()
    }

    /// Releases every handle owned by a candidate
    ///
    /// Returns the number of handles released. Releasing an unknown or
    /// already-released candidate is a no-op.
    pub fn release(&self, owner: CandidateId) -> usize {
        let mut state = self.state.lock();
        let Some(locators) = state.owners.remove(&owner) else {
            return 0;
        };
        let released = locators
            .iter()
            .filter(|l| state.data.remove(*l).is_some())
            .count();
        tracing::trace!(%owner, released, "Released preview handles");
        released
    }

    /// Releases every handle in the arena
    pub fn release_all(&self) -> usize {
        let mut state = self.state.lock();
        let released = state.data.len();
        state.data.clear();
        state.owners.clear();
        released
    }

    /// Number of live handles
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Number of live handles owned by one candidate
    #[must_use]
    pub fn handles_for(&self, owner: CandidateId) -> usize {
        self.state.lock().owners.get(&owner).map_or(0, Vec::len)
    }

    /// Resolves a locator to its bytes
    #[must_use]
    pub fn resolve(&self, locator: &PreviewLocator) -> Option<Bytes> {
        self.state.lock().data.get(locator).cloned()
    }
}

#[async_trait]
impl PreviewSource for PreviewArena {
    async fn fetch(&self, locator: &PreviewLocator) -> Result<Bytes, PreviewError> {
        self.resolve(locator)
            .ok_or_else(|| PreviewError::Released(locator.to_string()))
    }
}
