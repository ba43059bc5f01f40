//! JSON API over a bucket
//!
//! Routes:
//!
//! | Method   | Path             | Body                     | Response                       |
//! |----------|------------------|--------------------------|--------------------------------|
//! | `GET`    | `/images`        |                          | `{ success, images }`          |
//! | `DELETE` | `/images`        | `{ fileName }`           | `{ success, deleted }`         |
//! | `POST`   | `/images/delete` | `{ fileNames: [...] }`   | `{ success, deleted: n }`      |
//!
//! Failures are reported as `{ success: false, error }` with a matching
//! status code. Deleting a key that does not exist succeeds with
//! `deleted: 0`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront_media::http::{routes, GalleryState};
//! use storefront_media::storage::InMemoryObjectStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryObjectStore::with_buckets("http://localhost:3000/media", ["branding"]));
//! let app = routes(GalleryState::new(store, "branding"));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod handlers;
mod types;

pub use handlers::{delete_image, delete_images, list_images};
pub use types::{ApiError, BulkDeleteRequest, DeleteRequest, DeleteResponse, ImagesResponse};

use crate::storage::ObjectStore;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared state of the gallery routes
#[derive(Clone)]
pub struct GalleryState {
    /// Backing store
    pub store: Arc<dyn ObjectStore>,
    /// Bucket exposed by the routes
    pub bucket: String,
}

impl std::fmt::Debug for GalleryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryState")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl GalleryState {
    /// Creates state for `bucket` of `store`
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

/// Largest accepted request body; the routes only take small JSON documents
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Builds the router with request tracing and a body size limit
pub fn routes(state: GalleryState) -> Router {
    Router::new()
        .route("/images", get(list_images).delete(delete_image))
        .route("/images/delete", post(delete_images))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
