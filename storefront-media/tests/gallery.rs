//! Integration tests for the gallery
//!
//! Covers selection and deletion through the registry, both directly over
//! a store and through the JSON API served on a local port.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use storefront_media::gallery::{
    AssetRegistry, DeleteOutcome, HttpAssetSource, SelectionMode, SortOrder,
};
use storefront_media::http::{routes, GalleryState};
use storefront_media::storage::{InMemoryObjectStore, LocalObjectStore, ObjectStore, UploadOptions};

const BUCKET: &str = "branding";

fn seeded_store(names: &[&str]) -> InMemoryObjectStore {
    let store = InMemoryObjectStore::with_buckets("https://cdn.test", [BUCKET]);
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    for (i, name) in names.iter().enumerate() {
        let offset = i64::try_from(i).unwrap();
        store.insert(BUCKET, name, vec![0u8; 10 * (i + 1)], base + Duration::minutes(offset));
    }
    store
}

fn confirm(_: &str) -> bool {
    true
}

/// Five assets, two selected, delete confirmed: three remain and the selection empties.
#[tokio::test]
async fn test_bulk_delete_of_selection() {
    let store = seeded_store(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
    let mut gallery = AssetRegistry::for_bucket(Arc::new(store.clone()), BUCKET, SelectionMode::Multiple);
    assert_eq!(gallery.refresh().await.unwrap(), 5);

    let picks: Vec<_> = gallery
        .assets()
        .iter()
        .filter(|a| a.key == "b.png" || a.key == "d.png")
        .cloned()
        .collect();
    gallery.select_multiple(&picks);
    assert_eq!(gallery.selected().len(), 2);

    let outcome = gallery.delete_selected(&confirm).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted { requested: 2, removed: 2 });
    assert_eq!(gallery.assets().len(), 3);
    assert!(gallery.selected().is_empty());
    assert_eq!(store.len(BUCKET), 3);
    assert!(store.get(BUCKET, "b.png").is_none());
}

#[tokio::test]
async fn test_search_ignores_case_and_sort_reverses() {
    let store = seeded_store(&["Logo-Main.png", "banner.jpg", "logo-alt.png", "LOGO_small.webp"]);
    let mut gallery = AssetRegistry::for_bucket(Arc::new(store), BUCKET, SelectionMode::Single);
    gallery.refresh().await.unwrap();

    gallery.set_search("LoGo");
    gallery.set_sort(SortOrder::NameAsc);
    let ascending: Vec<_> = gallery.visible().iter().map(|a| a.key.clone()).collect();
    assert_eq!(ascending.len(), 3);

    gallery.set_sort(SortOrder::NameDesc);
    let mut descending: Vec<_> = gallery.visible().iter().map(|a| a.key.clone()).collect();
    descending.reverse();
    assert_eq!(ascending, descending);

    gallery.set_sort(SortOrder::DateDesc);
    assert_eq!(gallery.visible()[0].key, "LOGO_small.webp");
}

#[tokio::test]
async fn test_deleting_missing_key_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path().to_path_buf(), "http://localhost/media").unwrap();
    store.ensure_bucket(BUCKET).await.unwrap();
    store
        .upload(BUCKET, "logos/a.png", vec![1, 2, 3].into(), UploadOptions::new("image/png"))
        .await
        .unwrap();

    let keys = vec!["logos/a.png".to_string()];
    assert_eq!(store.remove(BUCKET, &keys).await.unwrap().deleted_count, 1);
    assert_eq!(store.remove(BUCKET, &keys).await.unwrap().deleted_count, 0);
    assert!(store.list(BUCKET).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_deletes_of_same_key_both_succeed() {
    let store = Arc::new(seeded_store(&["a.png"]));
    let keys = vec!["a.png".to_string()];
    let (first, second) = tokio::join!(store.remove(BUCKET, &keys), store.remove(BUCKET, &keys));
    let total = first.unwrap().deleted_count + second.unwrap().deleted_count;
    assert_eq!(total, 1);
}

/// The registry works unchanged when it reaches the bucket through the API.
#[tokio::test]
async fn test_registry_over_http_api() {
    let store = seeded_store(&["a.png", "b.png", "c.png"]);
    let app = routes(GalleryState::new(Arc::new(store.clone()), BUCKET));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let source = HttpAssetSource::new(format!("http://{addr}"));
    let mut gallery = AssetRegistry::new(Arc::new(source), SelectionMode::Multiple);
    assert_eq!(gallery.refresh().await.unwrap(), 3);

    // single delete goes through DELETE /images
    let a = gallery.assets().iter().find(|x| x.key == "a.png").cloned().unwrap();
    let outcome = gallery.delete_single(&a, &confirm).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted { requested: 1, removed: 1 });

    // bulk delete goes through POST /images/delete
    let rest: Vec<_> = gallery.assets().to_vec();
    gallery.select_multiple(&rest);
    gallery.delete_selected(&confirm).await.unwrap();

    assert!(gallery.assets().is_empty());
    assert!(store.is_empty(BUCKET));
}
