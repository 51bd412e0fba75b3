//! Core type definitions for the content cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the record holding the whole cache map
pub const CACHE_RECORD: &str = "summaryCache";

/// Cache key: resource identifier and language variant joined by `|`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(resource_id: &str, language: &str) -> Self {
        Self(format!("{}|{}", resource_id, language))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached payload as returned to readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPayload {
    pub payload: String,
    pub produced_by: String,
    pub created_at: DateTime<Utc>,
}

/// Per-entry line of the stats breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStats {
    pub key: String,
    pub produced_by: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the cache contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entries currently stored
    pub count: usize,

    /// Total payload size in bytes
    pub total_bytes: usize,

    /// Creation time of the oldest entry
    pub oldest: Option<DateTime<Utc>>,

    /// Creation time of the newest entry
    pub newest: Option<DateTime<Utc>>,

    /// One line per entry, oldest first
    pub entries: Vec<EntryStats>,
}

impl CacheStats {
    /// Whether a given key is present in the breakdown
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.iter().any(|e| e.key == key.as_str())
    }

    /// Average entry size in bytes
    pub fn avg_entry_size(&self) -> usize {
        if self.count == 0 {
            0
        } else {
            self.total_bytes / self.count
        }
    }
}
