//! Object key generation and validation
//!
//! Keys are `{folder/}{unix-millis}-{suffix}.{ext}`. The millisecond
//! timestamp keeps listings roughly chronological; the random suffix keeps
//! concurrent sessions and retries from colliding without any locking.

use super::types::{StorageError, StorageResult};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random part of a generated key
pub const SUFFIX_LEN: usize = 10;

/// Generates a fresh, collision-resistant object key
///
/// `folder` may be empty. `extension` is lowercased and any leading dot is
/// stripped; an empty extension produces a key without one.
///
/// # Examples
///
/// ```rust
/// use storefront_media::storage::key::generate_key;
///
/// let key = generate_key("logos", "PNG");
/// assert!(key.starts_with("logos/"));
/// assert!(key.ends_with(".png"));
/// ```
#[must_use]
pub fn generate_key(folder: &str, extension: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    let millis = Utc::now().timestamp_millis();

    let folder = folder.trim_matches('/');
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();

    let mut key = String::new();
    if !folder.is_empty() {
        key.push_str(folder);
        key.push('/');
    }
    key.push_str(&format!("{millis}-{suffix}"));
    if !extension.is_empty() {
        key.push('.');
        key.push_str(&extension);
    }
    key
}

/// Rejects keys that could escape the bucket or are otherwise unusable
///
/// # Errors
///
/// Returns `StorageError::InvalidKey` for empty keys, absolute keys,
/// `.`/`..` segments, empty segments, hidden segments, or backslashes.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment.starts_with('.') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
    }
    Ok(())
}

/// Returns the last path segment of a key, used as the display name
#[must_use]
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_key("carousel/", ".JPG");
        assert!(key.starts_with("carousel/"));
        assert!(key.ends_with(".jpg"));

        let name = file_name(&key);
        let (stamp, rest) = name.split_once('-').unwrap();
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(rest.len(), SUFFIX_LEN + ".jpg".len());
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn test_generated_key_without_folder_or_extension() {
        let key = generate_key("", "");
        assert!(!key.contains('/'));
        assert!(!key.contains('.'));
    }

    #[test]
    fn test_generated_keys_do_not_collide() {
        let keys: HashSet<String> = (0..1000).map(|_| generate_key("logos", "png")).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("logos/../secret").is_err());
        assert!(validate_key("logos//a.png").is_err());
        assert!(validate_key("logos/.meta").is_err());
        assert!(validate_key("logos\\a.png").is_err());
        assert!(validate_key("logos/a.png").is_ok());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("a/b/c.png"), "c.png");
        assert_eq!(file_name("c.png"), "c.png");
    }
}
