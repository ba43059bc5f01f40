//! File admission checks
//!
//! Every selected file passes through [`FileValidator::validate`] before it
//! may enter the upload queue. A rejection is reported to the caller right
//! away and is a different thing from a later upload failure.
//!
//! The declared media type is what the allow-set is matched against. In
//! strict mode the validator additionally sniffs magic numbers with `infer`
//! and refuses image files whose content contradicts their declared type.
//!
//! # Examples
//!
//! ```rust
//! use storefront_media::media::validation::FileValidator;
//! use storefront_media::storage::SelectedFile;
//!
//! let validator = FileValidator::new(["image/png", "image/jpeg"], 2.0);
//!
//! let ok = SelectedFile::new("logo.png", "image/png", vec![0u8; 1024]);
//! assert!(validator.validate(&ok).is_ok());
//!
//! let wrong_type = SelectedFile::new("notes.txt", "text/plain", vec![0u8; 8]);
//! assert!(validator.validate(&wrong_type).is_err());
//! ```

use crate::storage::SelectedFile;
use thiserror::Error;

/// Bytes in one megabyte as used by the size limit
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Reasons a file is refused before queueing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Declared media type not in the allow-set
    #[error("{file}: type {media_type} is not allowed (allowed: {allowed})")]
    UnsupportedType {
        /// File name
        file: String,
        /// Declared media type
        media_type: String,
        /// Allowed types, comma separated
        allowed: String,
    },

    /// File larger than the configured maximum
    #[error("{file}: {size_bytes} bytes exceeds the {max_mb} MB limit")]
    TooLarge {
        /// File name
        file: String,
        /// Actual size
        size_bytes: u64,
        /// Configured maximum in megabytes
        max_mb: f64,
    },

    /// Content signature contradicts the declared image type
    #[error("{file}: declared as {declared} but content looks like {detected}")]
    SignatureMismatch {
        /// File name
        file: String,
        /// Declared media type
        declared: String,
        /// Type detected from magic numbers
        detected: String,
    },
}

/// Type and size policy applied to selected files
#[derive(Debug, Clone)]
pub struct FileValidator {
    allowed_types: Vec<String>,
    max_file_size_mb: f64,
    strict: bool,
}

impl FileValidator {
    /// Creates a validator from an allow-set and a size limit in megabytes
    #[must_use]
    pub fn new<I, S>(allowed_types: I, max_file_size_mb: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_types: allowed_types
                .into_iter()
                .map(|t| t.into().to_ascii_lowercase())
                .collect(),
            max_file_size_mb,
            strict: false,
        }
    }

    /// Enables magic-number verification for image types
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Maximum size in bytes derived from the megabyte limit
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_bytes(&self) -> u64 {
        (self.max_file_size_mb * BYTES_PER_MB).floor() as u64
    }

    /// Allowed media types
    #[must_use]
    pub fn allowed_types(&self) -> &[String] {
        &self.allowed_types
    }

    /// Checks a file against the policy
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] that applies: type, then size,
    /// then (strict mode only) signature.
    pub fn validate(&self, file: &SelectedFile) -> Result<(), ValidationError> {
        let declared = file.media_type.to_ascii_lowercase();
        if !self.allowed_types.iter().any(|t| *t == declared) {
            return Err(ValidationError::UnsupportedType {
                file: file.name.clone(),
                media_type: file.media_type.clone(),
                allowed: self.allowed_types.join(", "),
            });
        }

        if file.size() > self.max_bytes() {
            return Err(ValidationError::TooLarge {
                file: file.name.clone(),
                size_bytes: file.size(),
                max_mb: self.max_file_size_mb,
            });
        }

        if self.strict && file.is_image() {
            // Formats without a signature (e.g. SVG) cannot be verified and pass
            if let Some(kind) = infer::get(&file.data) {
                if kind.mime_type() != declared {
                    return Err(ValidationError::SignatureMismatch {
                        file: file.name.clone(),
                        declared: file.media_type.clone(),
                        detected: kind.mime_type().to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    fn validator() -> FileValidator {
        FileValidator::new(["image/png", "image/jpeg", "image/webp"], 1.0)
    }

    #[test]
    fn test_accepts_allowed_type_within_limit() {
        let file = SelectedFile::new("a.png", "image/png", vec![0u8; 1024]);
        assert!(validator().validate(&file).is_ok());
    }

    #[test]
    fn test_type_match_is_case_insensitive() {
        let file = SelectedFile::new("a.png", "IMAGE/PNG", vec![0u8; 16]);
        assert!(validator().validate(&file).is_ok());
    }

    #[test]
    fn test_rejects_unlisted_type() {
        let file = SelectedFile::new("doc.pdf", "application/pdf", vec![0u8; 16]);
        let err = validator().validate(&file).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
        assert!(err.to_string().contains("doc.pdf"));
    }

    #[test]
    fn test_size_limit_boundary() {
        let exact = SelectedFile::new("a.png", "image/png", vec![0u8; 1024 * 1024]);
        assert!(validator().validate(&exact).is_ok());

        let over = SelectedFile::new("a.png", "image/png", vec![0u8; 1024 * 1024 + 1]);
        assert!(matches!(
            validator().validate(&over),
            Err(ValidationError::TooLarge { size_bytes, .. }) if size_bytes == 1024 * 1024 + 1
        ));
    }

    #[test]
    fn test_fractional_megabytes() {
        let v = FileValidator::new(["image/png"], 0.5);
        assert_eq!(v.max_bytes(), 512 * 1024);
    }

    #[test]
    fn test_strict_mode_detects_mismatch() {
        let mut data = JPEG_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 32]);
        let file = SelectedFile::new("fake.png", "image/png", data);

        assert!(validator().validate(&file).is_ok());
        assert!(matches!(
            validator().strict(true).validate(&file),
            Err(ValidationError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn test_strict_mode_accepts_honest_file() {
        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 32]);
        let file = SelectedFile::new("real.png", "image/png", data);
        assert!(validator().strict(true).validate(&file).is_ok());
    }

    #[test]
    fn test_strict_mode_passes_undetectable_content() {
        let v = FileValidator::new(["image/svg+xml"], 1.0).strict(true);
        let file = SelectedFile::new("icon.svg", "image/svg+xml", b"<svg></svg>".to_vec());
        assert!(v.validate(&file).is_ok());
    }
}
