//! Persisted assets and their ordering

use crate::storage::{key, ObjectEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An object already stored in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAsset {
    /// Storage key, unique within the bucket
    pub key: String,
    /// Public URL
    pub url: String,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
    /// Stored size in bytes
    pub size_bytes: u64,
    /// Width in pixels, when recorded at upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels, when recorded at upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Media type, when recorded at upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl RemoteAsset {
    /// Display name: the last segment of the key
    #[must_use]
    pub fn name(&self) -> &str {
        key::file_name(&self.key)
    }

    /// Whether the name contains `term`, ignoring case
    ///
    /// An empty or blank term matches everything.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty() || self.name().to_lowercase().contains(&term.to_lowercase())
    }
}

impl From<ObjectEntry> for RemoteAsset {
    fn from(entry: ObjectEntry) -> Self {
        let metadata = entry.metadata.unwrap_or_default();
        Self {
            key: entry.name,
            url: entry.url,
            created_at: entry.created_at,
            size_bytes: entry.size_bytes,
            width: metadata.width,
            height: metadata.height,
            mime: metadata.mime,
        }
    }
}

/// Gallery ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Newest first
    #[default]
    DateDesc,
    /// Oldest first
    DateAsc,
    /// Name A to Z
    NameAsc,
    /// Name Z to A
    NameDesc,
    /// Smallest first
    SizeAsc,
    /// Largest first
    SizeDesc,
}

impl SortOrder {
    /// Every ordering, for menus
    pub const ALL: [Self; 6] = [
        Self::DateDesc,
        Self::DateAsc,
        Self::NameAsc,
        Self::NameDesc,
        Self::SizeAsc,
        Self::SizeDesc,
    ];

    /// Kebab-case identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::SizeAsc => "size-asc",
            Self::SizeDesc => "size-desc",
        }
    }

    /// The same field in the other direction
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::DateDesc => Self::DateAsc,
            Self::DateAsc => Self::DateDesc,
            Self::NameAsc => Self::NameDesc,
            Self::NameDesc => Self::NameAsc,
            Self::SizeAsc => Self::SizeDesc,
            Self::SizeDesc => Self::SizeAsc,
        }
    }

    const fn is_descending(self) -> bool {
        matches!(self, Self::DateDesc | Self::NameDesc | Self::SizeDesc)
    }

    /// Compares two assets
    ///
    /// Ties on the sort field are broken by key, so this is a total order
    /// and each descending order is the exact reverse of its ascending one.
    #[must_use]
    pub fn compare(self, a: &RemoteAsset, b: &RemoteAsset) -> Ordering {
        let ascending = match self {
            Self::DateAsc | Self::DateDesc => a.created_at.cmp(&b.created_at),
            Self::NameAsc | Self::NameDesc => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
            Self::SizeAsc | Self::SizeDesc => a.size_bytes.cmp(&b.size_bytes),
        }
        .then_with(|| a.key.cmp(&b.key));

        if self.is_descending() {
            ascending.reverse()
        } else {
            ascending
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let options: Vec<_> = Self::ALL.iter().map(|o| o.as_str()).collect();
                format!("unknown sort order '{s}' (expected one of {})", options.join(", "))
            })
    }
}

/// Filters by `search` then sorts by `order`
#[must_use]
pub fn arrange<'a>(assets: &'a [RemoteAsset], search: &str, order: SortOrder) -> Vec<&'a RemoteAsset> {
    let mut visible: Vec<_> = assets.iter().filter(|a| a.matches(search)).collect();
    visible.sort_by(|a, b| order.compare(a, b));
    visible
}
