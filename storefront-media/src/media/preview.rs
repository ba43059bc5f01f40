//! Passive preview rendering
//!
//! A [`PreviewRenderer`] drives one preview surface through
//! `Deferred → Loading → Ready | Failed`. With lazy loading the fetch is held
//! back until the surface intersects the viewport (expanded by a margin).
//! Outcomes are reported through callbacks only; the renderer holds no
//! reference to a queue or a gallery, so both can reuse it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use storefront_media::media::arena::PreviewLocator;
//! use storefront_media::media::preview::{PreviewRenderer, Rect};
//!
//! # async fn example(source: &dyn storefront_media::media::preview::PreviewSource) {
//! let mut renderer = PreviewRenderer::new(PreviewLocator::new("https://cdn.example/a.png"), true)
//!     .on_load(|dims| println!("loaded {dims}"))
//!     .on_error(|reason| eprintln!("preview failed: {reason}"));
//!
//! // Not visible yet: nothing is fetched
//! renderer.observe(Rect::new(0.0, 2000.0, 200.0, 200.0), Rect::new(0.0, 0.0, 800.0, 600.0));
//! renderer.load(source).await;
//!
//! // Scrolled into view
//! renderer.observe(Rect::new(0.0, 500.0, 200.0, 200.0), Rect::new(0.0, 0.0, 800.0, 600.0));
//! renderer.load(source).await;
//! # }
//! ```

use super::arena::PreviewLocator;
use super::probe::Dimensions;
use async_trait::async_trait;
use bytes::Bytes;
use image::ImageReader;
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

/// Default bounding box for generated thumbnails
pub const DEFAULT_THUMBNAIL_EDGE: u32 = 320;

/// Default margin around the viewport that still counts as visible
pub const DEFAULT_ROOT_MARGIN: f32 = 200.0;

/// Errors while fetching or decoding a preview
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    /// The local handle was released before it was read
    #[error("preview handle released: {0}")]
    Released(String),

    /// The remote source could not be fetched
    #[error("failed to fetch preview: {0}")]
    Fetch(String),

    /// The bytes are not a decodable image
    #[error("failed to decode preview: {0}")]
    Decode(String),
}

/// Resolves locators to encoded image bytes
#[async_trait]
pub trait PreviewSource: Send + Sync {
    /// Fetches the bytes behind a locator
    async fn fetch(&self, locator: &PreviewLocator) -> Result<Bytes, PreviewError>;
}

/// Fetches remote asset URLs over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpPreviewSource {
    client: reqwest::Client,
}

impl HttpPreviewSource {
    /// Creates a source using the given client
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PreviewSource for HttpPreviewSource {
    async fn fetch(&self, locator: &PreviewLocator) -> Result<Bytes, PreviewError> {
        let response = self
            .client
            .get(locator.as_str())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PreviewError::Fetch(e.to_string()))?;
        response
            .bytes()
            .await
            .map_err(|e| PreviewError::Fetch(e.to_string()))
    }
}

/// Axis-aligned rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether `self` overlaps `viewport` grown by `margin` on every side
    #[must_use]
    pub fn intersects(&self, viewport: &Self, margin: f32) -> bool {
        let left = viewport.x - margin;
        let top = viewport.y - margin;
        let right = viewport.x + viewport.width + margin;
        let bottom = viewport.y + viewport.height + margin;

        self.x < right && self.x + self.width > left && self.y < bottom && self.y + self.height > top
    }
}

/// Display state of a preview surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    /// Lazy and not yet visible; nothing fetched
    Deferred,
    /// Fetch or decode in progress (loading indicator)
    Loading,
    /// Decoded successfully
    Ready {
        /// Natural dimensions of the source
        dimensions: Dimensions,
        /// PNG thumbnail bounded by the thumbnail edge
        thumbnail: Bytes,
    },
    /// Fetch or decode failed (error placeholder)
    Failed {
        /// Human-readable reason
        reason: String,
    },
}

impl PreviewState {
    /// Short state name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::Loading => "loading",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

type LoadCallback = Box<dyn Fn(Dimensions) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

/// One lazily loading preview surface
pub struct PreviewRenderer {
    locator: PreviewLocator,
    lazy: bool,
    visible: bool,
    root_margin: f32,
    thumbnail_edge: u32,
    state: PreviewState,
    on_load: Option<LoadCallback>,
    on_error: Option<ErrorCallback>,
}

impl fmt::Debug for PreviewRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewRenderer")
            .field("locator", &self.locator)
            .field("lazy", &self.lazy)
            .field("visible", &self.visible)
            .field("state", &self.state.name())
            .finish_non_exhaustive()
    }
}

impl PreviewRenderer {
    /// Creates a renderer for `locator`
    ///
    /// Eager renderers start in `Loading`; lazy ones start in `Deferred`.
    #[must_use]
    pub fn new(locator: PreviewLocator, lazy: bool) -> Self {
        Self {
            locator,
            lazy,
            visible: !lazy,
            root_margin: DEFAULT_ROOT_MARGIN,
            thumbnail_edge: DEFAULT_THUMBNAIL_EDGE,
            state: if lazy { PreviewState::Deferred } else { PreviewState::Loading },
            on_load: None,
            on_error: None,
        }
    }

    /// Registers the load callback
    #[must_use]
    pub fn on_load(mut self, callback: impl Fn(Dimensions) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Box::new(callback));
        self
    }

    /// Registers the error callback
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Overrides the viewport margin
    #[must_use]
    pub const fn with_root_margin(mut self, margin: f32) -> Self {
        self.root_margin = margin;
        self
    }

    /// Overrides the thumbnail bounding box
    #[must_use]
    pub const fn with_thumbnail_edge(mut self, edge: u32) -> Self {
        self.thumbnail_edge = edge;
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &PreviewState {
        &self.state
    }

    /// Locator being rendered
    #[must_use]
    pub const fn locator(&self) -> &PreviewLocator {
        &self.locator
    }

    /// Feeds a layout observation; returns whether a fetch is now due
    ///
    /// Once visible the renderer stays armed; scrolling away does not undo
    /// a load.
    pub fn observe(&mut self, element: Rect, viewport: Rect) -> bool {
        if element.intersects(&viewport, self.root_margin) {
            self.visible = true;
            if self.state == PreviewState::Deferred {
                self.state = PreviewState::Loading;
            }
        }
        self.should_fetch()
    }

    /// Whether calling [`load`](Self::load) would fetch
    #[must_use]
    pub fn should_fetch(&self) -> bool {
        self.visible && self.state == PreviewState::Loading
    }

    /// Fetches and decodes the preview if it is due
    ///
    /// Does nothing while deferred or once settled.
    pub async fn load(&mut self, source: &dyn PreviewSource) -> &PreviewState {
        if !self.should_fetch() {
            return &self.state;
        }

        let edge = self.thumbnail_edge;
        let outcome = match source.fetch(&self.locator).await {
            Ok(bytes) => tokio::task::spawn_blocking(move || render_thumbnail(&bytes, edge))
                .await
                .unwrap_or_else(|e| Err(PreviewError::Decode(e.to_string()))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((dimensions, thumbnail)) => {
                tracing::trace!(locator = %self.locator, %dimensions, "Preview ready");
                if let Some(cb) = &self.on_load {
                    cb(dimensions);
                }
                self.state = PreviewState::Ready { dimensions, thumbnail };
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::debug!(locator = %self.locator, %reason, "Preview failed");
                if let Some(cb) = &self.on_error {
                    cb(&reason);
                }
                self.state = PreviewState::Failed { reason };
            }
        }
        &self.state
    }
}

/// Decodes an image and produces a bounded PNG thumbnail
fn render_thumbnail(data: &[u8], edge: u32) -> Result<(Dimensions, Bytes), PreviewError> {
    let decoded = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PreviewError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| PreviewError::Decode(e.to_string()))?;
    let dimensions = Dimensions::new(decoded.width(), decoded.height());

    let thumbnail = decoded.thumbnail(edge, edge);
    let mut buffer = Vec::new();
    thumbnail
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| PreviewError::Decode(e.to_string()))?;
    Ok((dimensions, Bytes::from(buffer)))
}
