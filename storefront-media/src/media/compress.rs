//! Client-side resize and re-encode
//!
//! The compressor shrinks oversized images to fit a [`CompressionProfile`]
//! and re-encodes them before upload. It never fails: any decode or encode
//! problem, or a non-image input, hands back the original bytes with
//! [`CompressedAsset::fallback`] set.
//!
//! # Examples
//!
//! ```rust,no_run
//! use storefront_media::media::compress::{CompressionProfile, Compressor, OutputFormat};
//!
//! # fn example(bytes: bytes::Bytes) {
//! let profile = CompressionProfile {
//!     quality: 0.8,
//!     max_width: 1920,
//!     max_height: 1080,
//!     output_format: OutputFormat::Jpeg,
//! };
//!
//! let out = Compressor::new().compress(bytes, "image/png", &profile);
//! println!("{} -> {} ({})", out.original_size, out.data.len(), out.media_type);
//! # }
//! ```

use super::probe::Dimensions;
use crate::storage::is_image_type;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

/// Target encoding for compressed output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Keep the source format
    #[default]
    Original,
    /// Lossy JPEG at the profile quality
    Jpeg,
    /// WebP (lossless encoder)
    Webp,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Original => "original",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        };
        f.write_str(name)
    }
}

/// Parameters controlling one compression pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionProfile {
    /// Encoder quality in `(0, 1]`
    pub quality: f32,
    /// Maximum output width in pixels
    pub max_width: u32,
    /// Maximum output height in pixels
    pub max_height: u32,
    /// Output encoding
    pub output_format: OutputFormat,
}

impl Default for CompressionProfile {
    fn default() -> Self {
        Self {
            quality: 0.8,
            max_width: 1920,
            max_height: 1080,
            output_format: OutputFormat::Original,
        }
    }
}

impl CompressionProfile {
    /// Whether the profile satisfies its range invariants
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.quality > 0.0 && self.quality <= 1.0 && self.max_width > 0 && self.max_height > 0
    }

    /// Quality mapped onto the 1..=100 scale used by JPEG
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality.clamp(0.01, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Result of a compression pass
#[derive(Debug, Clone)]
pub struct CompressedAsset {
    /// Encoded bytes (the original bytes on fallback)
    pub data: Bytes,
    /// Media type of `data`
    pub media_type: String,
    /// Dimensions of `data`, zero when unknown
    pub dimensions: Dimensions,
    /// Size of the input in bytes
    pub original_size: u64,
    /// Whether the input was returned unchanged because processing failed
    pub fallback: bool,
}

impl CompressedAsset {
    fn unchanged(data: Bytes, media_type: &str) -> Self {
        let original_size = data.len() as u64;
        Self {
            data,
            media_type: media_type.to_string(),
            dimensions: Dimensions::zero(),
            original_size,
            fallback: true,
        }
    }

    /// Size of the output in bytes
    #[must_use]
    pub fn compressed_size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Computes the size an image must be scaled to so it fits the maximums
///
/// Images already within bounds keep their size. Otherwise both sides are
/// scaled by one ratio so the limiting side lands exactly on its maximum;
/// the other side is rounded and never drops below one pixel.
///
/// # Examples
///
/// ```rust
/// use storefront_media::media::compress::fit_within;
///
/// assert_eq!(fit_within((4000, 2000), (1920, 1080)), (1920, 960));
/// assert_eq!(fit_within((800, 600), (1920, 1080)), (800, 600));
/// ```
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn fit_within(source: (u32, u32), max: (u32, u32)) -> (u32, u32) {
    let (width, height) = source;
    let (max_width, max_height) = max;
    if width <= max_width && height <= max_height {
        return source;
    }

    let ratio = (f64::from(max_width) / f64::from(width)).min(f64::from(max_height) / f64::from(height));
    let scaled = |side: u32, limit: u32| -> u32 {
        ((f64::from(side) * ratio).round() as u32).clamp(1, limit.max(1))
    };
    (scaled(width, max_width), scaled(height, max_height))
}

/// Resizes and re-encodes images against a profile
#[derive(Debug, Clone)]
pub struct Compressor {
    filter: FilterType,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor {
    /// Creates a compressor using `FilterType::Lanczos3`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Creates a compressor with a specific resampling filter
    #[must_use]
    pub const fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Compresses `data` according to `profile`
    ///
    /// This is CPU-bound; async callers should run it on the blocking pool.
    #[must_use]
    pub fn compress(&self, data: Bytes, media_type: &str, profile: &CompressionProfile) -> CompressedAsset {
        if !is_image_type(media_type) {
            return CompressedAsset::unchanged(data, media_type);
        }

        match self.try_compress(&data, media_type, profile) {
            Ok(asset) => asset,
            Err(reason) => {
                tracing::warn!(media_type, %reason, "Compression failed, keeping original bytes");
                CompressedAsset::unchanged(data, media_type)
            }
        }
    }

    fn try_compress(
        &self,
        data: &Bytes,
        media_type: &str,
        profile: &CompressionProfile,
    ) -> Result<CompressedAsset, String> {
        let source_format = ImageFormat::from_mime_type(media_type)
            .ok_or_else(|| format!("no codec for {media_type}"))?;
        let target_format = match profile.output_format {
            OutputFormat::Original => source_format,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Webp => ImageFormat::WebP,
        };

        let decoded = ImageReader::with_format(Cursor::new(data.as_ref()), source_format)
            .decode()
            .map_err(|e| format!("decode failed: {e}"))?;

        let (width, height) = fit_within(
            (decoded.width(), decoded.height()),
            (profile.max_width, profile.max_height),
        );
        let resized = if (width, height) == (decoded.width(), decoded.height()) {
            decoded
        } else {
            decoded.resize_exact(width, height, self.filter)
        };

        let encoded = encode(&resized, target_format, profile)?;
        Ok(CompressedAsset {
            data: Bytes::from(encoded),
            media_type: target_format.to_mime_type().to_string(),
            dimensions: Dimensions::new(width, height),
            original_size: data.len() as u64,
            fallback: false,
        })
    }
}

fn encode(image: &DynamicImage, format: ImageFormat, profile: &CompressionProfile) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, profile.jpeg_quality());
            rgb.write_with_encoder(encoder)
                .map_err(|e| format!("jpeg encode failed: {e}"))?;
        }
        ImageFormat::WebP => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            let encoder = WebPEncoder::new_lossless(&mut buffer);
            rgba.write_with_encoder(encoder)
                .map_err(|e| format!("webp encode failed: {e}"))?;
        }
        other => {
            image
                .write_to(&mut Cursor::new(&mut buffer), other)
                .map_err(|e| format!("{other:?} encode failed: {e}"))?;
        }
    }
    Ok(buffer)
}

/// File extension conventionally used for a media type
#[must_use]
pub fn extension_for(media_type: &str) -> Option<&'static str> {
    let format = ImageFormat::from_mime_type(media_type)?;
    Some(match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        ImageFormat::Avif => "avif",
        _ => *format.extensions_str().first()?,
    })
}
