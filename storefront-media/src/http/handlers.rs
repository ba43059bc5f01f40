//! Gallery route handlers

use super::types::{ApiError, BulkDeleteRequest, DeleteRequest, DeleteResponse, ImagesResponse};
use super::GalleryState;
use crate::gallery::RemoteAsset;
use crate::storage::key::validate_key;
use axum::extract::State;
use axum::Json;

/// Lists every asset in the bucket
///
/// # Errors
///
/// Returns an [`ApiError`] when the store cannot list the bucket.
///
/// ```bash
/// GET /images
/// ```
///
/// ```json
/// { "success": true, "images": [{ "key": "logos/1700000000000-k3j9x0a1bc.png", "url": "...", "createdAt": "...", "sizeBytes": 5120 }] }
/// ```
pub async fn list_images(State(state): State<GalleryState>) -> Result<Json<ImagesResponse>, ApiError> {
    let entries = state.store.list(&state.bucket).await?;
    let images: Vec<RemoteAsset> = entries.into_iter().map(RemoteAsset::from).collect();
    tracing::debug!(bucket = %state.bucket, count = images.len(), "Listed images");
    Ok(Json(ImagesResponse {
        success: true,
        images,
        error: None,
    }))
}

/// Deletes one asset
///
/// # Errors
///
/// Returns an [`ApiError`] for an invalid key or a store failure.
pub async fn delete_image(
    State(state): State<GalleryState>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    remove_keys(&state, vec![request.file_name]).await
}

/// Deletes several assets in one call
///
/// # Errors
///
/// Returns an [`ApiError`] for an empty list, an invalid key, or a store
/// failure.
pub async fn delete_images(
    State(state): State<GalleryState>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if request.file_names.is_empty() {
        return Err(ApiError::bad_request("fileNames must not be empty"));
    }
    remove_keys(&state, request.file_names).await
}

async fn remove_keys(state: &GalleryState, keys: Vec<String>) -> Result<Json<DeleteResponse>, ApiError> {
    for key in &keys {
        validate_key(key)?;
    }
    let summary = state.store.remove(&state.bucket, &keys).await?;
    tracing::info!(
        bucket = %state.bucket,
        requested = keys.len(),
        deleted = summary.deleted_count,
        "Deleted images"
    );
    Ok(Json(DeleteResponse {
        success: true,
        deleted: Some(summary.deleted_count),
        error: None,
    }))
}
