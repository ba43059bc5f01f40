//! Logging setup
//!
//! Every pipeline stage emits `tracing` events with structured fields
//! (candidate id, file name, bucket, key). This module installs the
//! subscriber that renders them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
#[must_use]
pub const fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,storefront_media=trace"
    } else {
        "info"
    }
}

/// Installs the global subscriber
///
/// Reads `RUST_LOG`, falling back to [`default_filter`]. Debug builds log
/// in a pretty human format, release builds log JSON lines. Output goes
/// to stderr so command output on stdout stays machine-readable.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use storefront_media::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Media service started");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    #[cfg(debug_assertions)]
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
        .try_init()?;

    #[cfg(not(debug_assertions))]
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter()).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        // whichever call comes first in this process wins
        let _ = init();
        assert!(init().is_err());
    }
}
