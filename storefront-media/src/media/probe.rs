//! Natural-dimension probing

use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

/// Pixel dimensions of a raster image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    /// Creates a dimension pair
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The `{0,0}` value reported for undecodable input
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Whether both sides are zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Reads the natural pixel dimensions of an encoded image
///
/// Only the header is parsed. Input that is not a decodable image yields
/// [`Dimensions::zero`] instead of an error; the reader and its buffer are
/// dropped on both paths when this function returns.
///
/// # Examples
///
/// ```rust
/// use storefront_media::media::probe::{probe, Dimensions};
///
/// assert_eq!(probe(b"definitely not an image"), Dimensions::zero());
/// ```
#[must_use]
pub fn probe(data: &[u8]) -> Dimensions {
    let dims = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())
        .and_then(|reader| reader.into_dimensions().map_err(|e| e.to_string()));

    match dims {
        Ok((width, height)) => Dimensions { width, height },
        Err(reason) => {
            tracing::debug!(%reason, "Dimension probe failed, reporting 0x0");
            Dimensions::zero()
        }
    }
}
