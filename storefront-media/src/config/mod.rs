//! Configuration management
//!
//! Settings are layered with `figment`, later sources overriding earlier
//! ones:
//!
//! 1. Hardcoded defaults
//! 2. A TOML file (`./storefront-media.toml` unless another path is given)
//! 3. Environment variables prefixed `STOREFRONT_MEDIA_`, nested with `__`
//!    (e.g. `STOREFRONT_MEDIA_UPLOADER__MAX_FILES=4`)
//!
//! # Example Configuration
//!
//! ```toml
//! [uploader]
//! max_files = 10
//! max_file_size_mb = 5.0
//! allowed_types = ["image/png", "image/jpeg", "image/webp"]
//! auto_compress = true
//! folder = "logos"
//!
//! [compression]
//! quality = 0.8
//! max_width = 1920
//! max_height = 1080
//! output_format = "webp"
//!
//! [storage]
//! root = "./media"
//! bucket = "branding"
//! public_base_url = "http://localhost:3000/media"
//!
//! [server]
//! addr = "127.0.0.1:3000"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use storefront_media::config::MediaConfig;
//!
//! # fn example() -> Result<(), storefront_media::MediaError> {
//! let config = MediaConfig::load(None)?;
//! config.validate()?;
//! println!("uploading into {}", config.storage.bucket);
//! # Ok(())
//! # }
//! ```

use crate::error::MediaError;
use crate::media::compress::CompressionProfile;
use crate::media::validation::FileValidator;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "STOREFRONT_MEDIA_";

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "storefront-media.toml";

/// Upload queue policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Maximum number of candidates held in the queue
    pub max_files: usize,

    /// Maximum accepted file size in megabytes
    pub max_file_size_mb: f64,

    /// Accepted declared media types
    pub allowed_types: Vec<String>,

    /// Run a compression pass as soon as images are queued
    pub auto_compress: bool,

    /// Reject image files whose magic bytes contradict their declared type
    pub verify_signatures: bool,

    /// Delay before succeeded candidates are pruned from the queue
    pub prune_delay_ms: u64,

    /// Key prefix inside the bucket (may be empty)
    pub folder: String,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_size_mb: 5.0,
            allowed_types: ["image/png", "image/jpeg", "image/gif", "image/webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            auto_compress: true,
            verify_signatures: false,
            prune_delay_ms: 2000,
            folder: String::new(),
        }
    }
}

impl UploaderConfig {
    /// Builds the admission validator for this policy
    #[must_use]
    pub fn validator(&self) -> FileValidator {
        FileValidator::new(self.allowed_types.iter().cloned(), self.max_file_size_mb)
            .strict(self.verify_signatures)
    }
}

/// Object storage location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory of the local backend
    pub root: PathBuf,

    /// Bucket the uploader and gallery operate on
    pub bucket: String,

    /// Base URL under which stored objects are served
    pub public_base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./media"),
            bucket: "branding".to_string(),
            public_base_url: "http://localhost:3000/media".to_string(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Upload queue policy
    #[serde(default)]
    pub uploader: UploaderConfig,

    /// Compression profile applied by the uploader
    #[serde(default)]
    pub compression: CompressionProfile,

    /// Storage location
    #[serde(default)]
    pub storage: StorageSettings,

    /// HTTP server
    #[serde(default)]
    pub server: ServerSettings,
}

impl MediaConfig {
    /// Loads configuration from defaults, a TOML file and the environment
    ///
    /// With `path == None` the default file is used when it exists.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Config` if the file cannot be parsed or an
    /// environment variable holds a value of the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, MediaError> {
        let file = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        tracing::debug!(file = %file.display(), bucket = %config.storage.bucket, "Configuration loaded");
        Ok(config)
    }

    /// Renders the effective configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Render` if a value has no TOML representation.
    pub fn to_toml(&self) -> Result<String, MediaError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks range and positivity constraints
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), MediaError> {
        let invalid = |msg: &str| Err(MediaError::InvalidConfig(msg.to_string()));

        if self.uploader.max_files == 0 {
            return invalid("uploader.max_files must be greater than 0");
        }
        if !(self.uploader.max_file_size_mb > 0.0) {
            return invalid("uploader.max_file_size_mb must be greater than 0");
        }
        if self.uploader.allowed_types.is_empty() {
            return invalid("uploader.allowed_types must not be empty");
        }
        if !(self.compression.quality > 0.0 && self.compression.quality <= 1.0) {
            return invalid("compression.quality must be in (0, 1]");
        }
        if self.compression.max_width == 0 || self.compression.max_height == 0 {
            return invalid("compression.max_width and max_height must be greater than 0");
        }
        if self.storage.bucket.trim().is_empty() {
            return invalid("storage.bucket must not be empty");
        }
        Ok(())
    }
}
