//! Browsable view over persisted assets
//!
//! The registry keeps the last listing together with the search term, sort
//! order and selection. It never touches an upload queue; chosen assets are
//! handed back through the `on_select_*` callbacks.

use super::asset::{arrange, RemoteAsset, SortOrder};
use super::source::{AssetSource, BucketAssets};
use crate::media::arena::PreviewLocator;
use crate::media::preview::PreviewRenderer;
use crate::storage::{ObjectStore, StorageResult};
use std::fmt;
use std::sync::Arc;

/// Whether one or many assets can be chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// At most one asset
    #[default]
    Single,
    /// Any number of assets
    Multiple,
}

/// Asks the user to confirm a destructive action
pub trait ConfirmPrompt: Send + Sync {
    /// Returns `true` to proceed
    fn confirm(&self, message: &str) -> bool;
}

impl<F: Fn(&str) -> bool + Send + Sync> ConfirmPrompt for F {
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Result of a confirmed or declined delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing was selected; no prompt was shown
    NothingSelected,
    /// The user declined
    Declined,
    /// Keys were sent to the store
    Deleted {
        /// Keys requested
        requested: usize,
        /// Keys that existed and were removed
        removed: usize,
    },
}

type SelectImage = Box<dyn Fn(&str) + Send + Sync>;
type SelectMultiple = Box<dyn Fn(&[String]) + Send + Sync>;

/// Gallery state over one asset namespace
pub struct AssetRegistry {
    source: Arc<dyn AssetSource>,
    mode: SelectionMode,
    assets: Vec<RemoteAsset>,
    search: String,
    sort: SortOrder,
    selected: Vec<String>,
    on_select_image: Option<SelectImage>,
    on_select_multiple: Option<SelectMultiple>,
}

impl fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("mode", &self.mode)
            .field("assets", &self.assets.len())
            .field("search", &self.search)
            .field("sort", &self.sort)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl AssetRegistry {
    /// Creates an empty registry; call [`refresh`](Self::refresh) to load
    #[must_use]
    pub fn new(source: Arc<dyn AssetSource>, mode: SelectionMode) -> Self {
        Self {
            source,
            mode,
            assets: Vec::new(),
            search: String::new(),
            sort: SortOrder::default(),
            selected: Vec::new(),
            on_select_image: None,
            on_select_multiple: None,
        }
    }

    /// Creates a registry reading `bucket` of `store` directly
    #[must_use]
    pub fn for_bucket<S>(store: Arc<S>, bucket: impl Into<String>, mode: SelectionMode) -> Self
    where
        S: ObjectStore + ?Sized + 'static,
    {
        Self::new(Arc::new(BucketAssets::new(store, bucket)), mode)
    }

    /// Registers the single-selection callback
    #[must_use]
    pub fn on_select_image(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_select_image = Some(Box::new(callback));
        self
    }

    /// Registers the multi-selection callback
    #[must_use]
    pub fn on_select_multiple(mut self, callback: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.on_select_multiple = Some(Box::new(callback));
        self
    }

    /// Reloads every asset from the source
    ///
    /// Selected URLs that no longer exist are dropped from the selection.
    ///
    /// # Errors
    ///
    /// Returns the source error and keeps the previous listing.
    pub async fn refresh(&mut self) -> StorageResult<usize> {
        let assets = self.source.list().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Gallery refresh failed");
        })?;
        self.selected.retain(|url| assets.iter().any(|a| a.url == *url));
        self.assets = assets;
        tracing::debug!(count = self.assets.len(), "Gallery refreshed");
        Ok(self.assets.len())
    }

    /// Sets the case-insensitive name filter
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Sets the ordering
    pub fn set_sort(&mut self, order: SortOrder) {
        self.sort = order;
    }

    /// Current search term
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Current ordering
    #[must_use]
    pub const fn sort(&self) -> SortOrder {
        self.sort
    }

    /// Selection mode fixed at construction
    #[must_use]
    pub const fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Every loaded asset, unfiltered
    #[must_use]
    pub fn assets(&self) -> &[RemoteAsset] {
        &self.assets
    }

    /// Assets matching the search, in the current order
    #[must_use]
    pub fn visible(&self) -> Vec<&RemoteAsset> {
        arrange(&self.assets, &self.search, self.sort)
    }

    /// Lazy preview surface for an asset
    #[must_use]
    pub fn renderer_for(asset: &RemoteAsset) -> PreviewRenderer {
        PreviewRenderer::new(PreviewLocator::new(asset.url.clone()), true)
    }

    /// Toggles an asset's URL in the selection
    ///
    /// In single mode choosing another asset replaces the selection.
    /// Returns whether the asset is selected afterwards.
    pub fn select(&mut self, asset: &RemoteAsset) -> bool {
        if let Some(index) = self.selected.iter().position(|u| *u == asset.url) {
            self.selected.remove(index);
            return false;
        }
        if self.mode == SelectionMode::Single {
            self.selected.clear();
        }
        self.selected.push(asset.url.clone());
        true
    }

    /// Toggles several assets at once (multiple mode)
    ///
    /// In single mode only the last asset ends up selected.
    pub fn select_multiple<'a>(&mut self, assets: impl IntoIterator<Item = &'a RemoteAsset>) {
        for asset in assets {
            self.select(asset);
        }
    }

    /// Selected URLs in selection order
    #[must_use]
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Whether an asset is selected
    #[must_use]
    pub fn is_selected(&self, asset: &RemoteAsset) -> bool {
        self.selected.contains(&asset.url)
    }

    /// Clears the selection
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Hands the selection to the caller and clears it
    ///
    /// Single mode fires `on_select_image` with the chosen URL; multiple
    /// mode fires `on_select_multiple` with every URL. Nothing fires for an
    /// empty selection.
    pub fn confirm_selection(&mut self) -> Vec<String> {
        let urls = std::mem::take(&mut self.selected);
        match (self.mode, urls.first()) {
            (_, None) => {}
            (SelectionMode::Single, Some(url)) => {
                if let Some(cb) = &self.on_select_image {
                    cb(url);
                }
            }
            (SelectionMode::Multiple, Some(_)) => {
                if let Some(cb) = &self.on_select_multiple {
                    cb(&urls);
                }
            }
        }
        urls
    }

    fn keys_for(&self, urls: &[String]) -> Vec<String> {
        self.assets
            .iter()
            .filter(|a| urls.contains(&a.url))
            .map(|a| a.key.clone())
            .collect()
    }

    /// Deletes every selected asset after confirmation
    ///
    /// On confirmation the keys are removed, the listing is refreshed and
    /// the selection is cleared, even if the delete call fails.
    ///
    /// # Errors
    ///
    /// Returns the first error from the delete call or the refresh.
    pub async fn delete_selected(&mut self, prompt: &dyn ConfirmPrompt) -> StorageResult<DeleteOutcome> {
        if self.selected.is_empty() {
            return Ok(DeleteOutcome::NothingSelected);
        }
        let count = self.selected.len();
        let noun = if count == 1 { "image" } else { "images" };
        if !prompt.confirm(&format!("Delete {count} selected {noun}? This cannot be undone.")) {
            return Ok(DeleteOutcome::Declined);
        }

        let keys = self.keys_for(&self.selected);
        self.selected.clear();
        self.delete_and_refresh(keys).await
    }

    /// Deletes one asset after confirmation
    ///
    /// # Errors
    ///
    /// Returns the first error from the delete call or the refresh.
    pub async fn delete_single(
        &mut self,
        asset: &RemoteAsset,
        prompt: &dyn ConfirmPrompt,
    ) -> StorageResult<DeleteOutcome> {
        if !prompt.confirm(&format!("Delete {}? This cannot be undone.", asset.name())) {
            return Ok(DeleteOutcome::Declined);
        }
        self.selected.retain(|u| *u != asset.url);
        self.delete_and_refresh(vec![asset.key.clone()]).await
    }

    async fn delete_and_refresh(&mut self, keys: Vec<String>) -> StorageResult<DeleteOutcome> {
        let deleted = self.source.delete(&keys).await;
        let refreshed = self.refresh().await;

        let removed = deleted.inspect_err(|e| tracing::warn!(error = %e, "Gallery delete failed"))?;
        refreshed?;
        tracing::info!(requested = keys.len(), removed, "Gallery assets deleted");
        Ok(DeleteOutcome::Deleted {
            requested: keys.len(),
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::source::MockAssetSource;
    use crate::storage::StorageError;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    fn asset(key: &str) -> RemoteAsset {
        RemoteAsset {
            key: key.to_string(),
            url: format!("https://cdn.test/b/{key}"),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            size_bytes: 10,
            width: None,
            height: None,
            mime: None,
        }
    }

    fn listing(keys: &[&str]) -> Vec<RemoteAsset> {
        keys.iter().map(|k| asset(k)).collect()
    }

    fn yes(_: &str) -> bool {
        true
    }

    fn no(_: &str) -> bool {
        false
    }

    #[tokio::test]
    async fn test_single_mode_replaces_selection() {
        let mut source = MockAssetSource::new();
        source.expect_list().returning(|| Ok(listing(&["a.png", "b.png"])));
        let mut registry = AssetRegistry::new(Arc::new(source), SelectionMode::Single);
        registry.refresh().await.unwrap();

        let a = asset("a.png");
        let b = asset("b.png");
        assert!(registry.select(&a));
        assert!(registry.select(&b));
        assert_eq!(registry.selected(), [b.url.clone()]);
        assert!(!registry.select(&b));
        assert!(registry.selected().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_selection_fires_callbacks() {
        let chosen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&chosen);
        let mut registry = AssetRegistry::new(Arc::new(MockAssetSource::new()), SelectionMode::Multiple)
            .on_select_multiple(move |urls| sink.lock().extend_from_slice(urls));

        registry.select_multiple([&asset("a.png"), &asset("b.png")]);
        let urls = registry.confirm_selection();
        assert_eq!(urls.len(), 2);
        assert_eq!(*chosen.lock(), urls);
        assert!(registry.selected().is_empty());

        // empty selection fires nothing
        registry.confirm_selection();
        assert_eq!(chosen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_single_confirm_fires_on_select_image() {
        let chosen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&chosen);
        let mut registry = AssetRegistry::new(Arc::new(MockAssetSource::new()), SelectionMode::Single)
            .on_select_image(move |url| *sink.lock() = Some(url.to_string()));

        registry.select(&asset("a.png"));
        registry.confirm_selection();
        assert_eq!(chosen.lock().as_deref(), Some("https://cdn.test/b/a.png"));
    }

    #[tokio::test]
    async fn test_declined_delete_does_nothing() {
        let mut source = MockAssetSource::new();
        source.expect_list().returning(|| Ok(listing(&["a.png"])));
        source.expect_delete().never();
        let mut registry = AssetRegistry::new(Arc::new(source), SelectionMode::Multiple);
        registry.refresh().await.unwrap();

        registry.select(&asset("a.png"));
        assert_eq!(registry.delete_selected(&no).await.unwrap(), DeleteOutcome::Declined);
        assert_eq!(registry.selected().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_without_selection_skips_prompt() {
        let mut registry = AssetRegistry::new(Arc::new(MockAssetSource::new()), SelectionMode::Multiple);
        let prompt = |_: &str| -> bool { panic!("prompt shown") };
        assert_eq!(
            registry.delete_selected(&prompt).await.unwrap(),
            DeleteOutcome::NothingSelected
        );
    }

    #[tokio::test]
    async fn test_failed_delete_still_refreshes_and_clears() {
        let mut source = MockAssetSource::new();
        source.expect_list().times(2).returning(|| Ok(listing(&["a.png", "b.png"])));
        source
            .expect_delete()
            .times(1)
            .returning(|_| Err(StorageError::PermissionDenied("policy".into())));
        let mut registry = AssetRegistry::new(Arc::new(source), SelectionMode::Multiple);
        registry.refresh().await.unwrap();

        registry.select(&asset("a.png"));
        let result = registry.delete_selected(&yes).await;
        assert!(matches!(result, Err(StorageError::PermissionDenied(_))));
        assert!(registry.selected().is_empty());
    }

    #[tokio::test]
    async fn test_delete_single_sends_one_key() {
        let mut source = MockAssetSource::new();
        source.expect_list().returning(|| Ok(listing(&["logos/a.png"])));
        source
            .expect_delete()
            .withf(|keys| keys == ["logos/a.png".to_string()])
            .times(1)
            .returning(|keys| Ok(keys.len()));
        let mut registry = AssetRegistry::new(Arc::new(source), SelectionMode::Single);
        registry.refresh().await.unwrap();

        let outcome = registry.delete_single(&asset("logos/a.png"), &yes).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted { requested: 1, removed: 1 });
    }

    #[tokio::test]
    async fn test_refresh_error_keeps_listing() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut source = MockAssetSource::new();
        source.expect_list().returning(move || {
            let mut n = counter.lock();
            *n += 1;
            if *n == 1 {
                Ok(listing(&["a.png"]))
            } else {
                Err(StorageError::Network("offline".into()))
            }
        });
        let mut registry = AssetRegistry::new(Arc::new(source), SelectionMode::Single);
        registry.refresh().await.unwrap();
        assert!(registry.refresh().await.is_err());
        assert_eq!(registry.assets().len(), 1);
    }

    #[tokio::test]
    async fn test_visible_applies_search_then_sort() {
        let mut source = MockAssetSource::new();
        source
            .expect_list()
            .returning(|| Ok(listing(&["Banner.png", "logo-b.png", "LOGO-a.png"])));
        let mut registry = AssetRegistry::new(Arc::new(source), SelectionMode::Single);
        registry.refresh().await.unwrap();

        registry.set_search("logo");
        registry.set_sort(SortOrder::NameAsc);
        let names: Vec<_> = registry.visible().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, ["LOGO-a.png", "logo-b.png"]);
    }

    #[test]
    fn test_renderer_for_remote_asset_is_lazy() {
        let renderer = AssetRegistry::renderer_for(&asset("a.png"));
        assert!(!renderer.locator().is_local());
        assert!(!renderer.should_fetch());
    }
}
