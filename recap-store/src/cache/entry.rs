//! Cache entry with creation-time expiry

use crate::cache::types::CachedPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored result for one cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The cached text
    pub payload: String,

    /// Model that produced the payload
    pub produced_by: String,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// Insertion counter, breaks ties between equal timestamps
    #[serde(default)]
    pub sequence: u64,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(payload: String, produced_by: String, sequence: u64) -> Self {
        Self::created_at(payload, produced_by, Utc::now(), sequence)
    }

    /// Create an entry with an explicit creation time
    pub fn created_at(
        payload: String,
        produced_by: String,
        created_at: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self {
            payload,
            produced_by,
            created_at,
            sequence,
        }
    }

    /// Age of the entry at `now`
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Whether the entry is older than `expiry` at `now`
    ///
    /// An entry exactly `expiry` old is still live.
    pub fn is_expired_at(&self, now: DateTime<Utc>, expiry: chrono::Duration) -> bool {
        self.age_at(now) > expiry
    }

    /// Payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }

    /// Ordering key for eviction: oldest first, insertion order on ties
    pub fn eviction_rank(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }

    pub fn to_cached(&self) -> CachedPayload {
        CachedPayload {
            payload: self.payload.clone(),
            produced_by: self.produced_by.clone(),
            created_at: self.created_at,
        }
    }
}
