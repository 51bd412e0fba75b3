//! Content cache backed by a key-value record
//!
//! The whole cache map lives in a single record ([`CACHE_RECORD`]). Every
//! operation loads it, mutates it and writes it back while holding the
//! cache's own mutex, so concurrent jobs never interleave their
//! read-modify-write sequences.
//!
//! The cache is best-effort: storage errors are logged and turn into a miss
//! (reads) or a dropped write, never into a caller-visible failure.

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    types::{CacheKey, CacheStats, CachedPayload, EntryStats, CACHE_RECORD},
};
use crate::kv::{load_record, save_record, KvStore};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

type CacheMap = BTreeMap<CacheKey, CacheEntry>;

/// Time- and count-bounded cache of generated text
pub struct ContentCache {
    kv: Arc<dyn KvStore>,
    config: RwLock<CacheConfig>,
    /// Serializes load/mutate/save sequences
    op_lock: Mutex<()>,
}

impl ContentCache {
    /// Create a cache with explicit limits
    pub fn new(kv: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        info!("Initializing content cache with config: {:?}", config);

        Self {
            kv,
            config: RwLock::new(config.clamped()),
            op_lock: Mutex::new(()),
        }
    }

    /// Create a cache whose limits come from the settings record
    pub async fn from_settings(kv: Arc<dyn KvStore>) -> Self {
        let config = CacheConfig::from_settings(kv.as_ref()).await;
        Self::new(kv, config)
    }

    /// Current limits
    pub async fn config(&self) -> CacheConfig {
        *self.config.read().await
    }

    /// Re-read the limits from the settings record
    pub async fn reload_config(&self) -> CacheConfig {
        let config = CacheConfig::from_settings(self.kv.as_ref()).await;
        *self.config.write().await = config;
        debug!("Reloaded cache config: {:?}", config);
        config
    }

    /// Cached payload for a resource and language, if live
    pub async fn get(&self, resource_id: &str, language: &str) -> Option<String> {
        self.get_entry(resource_id, language)
            .await
            .map(|cached| cached.payload)
    }

    /// Cached payload with its metadata, if live
    ///
    /// An expired entry is deleted on the way out and reported as a miss.
    pub async fn get_entry(&self, resource_id: &str, language: &str) -> Option<CachedPayload> {
        let key = CacheKey::new(resource_id, language);
        let expiry = self.config().await.expiry();
        let _guard = self.op_lock.lock().await;

        let mut map = self.load_map().await?;

        let Some(entry) = map.get(&key) else {
            debug!("Cache miss: {}", key);
            return None;
        };

        if !entry.is_expired_at(Utc::now(), expiry) {
            debug!("Cache hit: {}", key);
            return Some(entry.to_cached());
        }

        debug!("Cache entry expired: {}", key);
        map.remove(&key);
        self.save_map(&map).await;
        None
    }

    /// Store a payload, evicting the oldest entries beyond `max_entries`
    pub async fn set(&self, resource_id: &str, language: &str, payload: &str, model: &str) {
        let key = CacheKey::new(resource_id, language);
        let max_entries = self.config().await.max_entries;
        let _guard = self.op_lock.lock().await;

        let Some(mut map) = self.load_map().await else {
            warn!("Dropping cache write for {}: cache record unreadable", key);
            return;
        };

        let sequence = map.values().map(|e| e.sequence).max().map_or(0, |s| s + 1);
        let entry = CacheEntry::new(payload.to_string(), model.to_string(), sequence);

        if map.insert(key.clone(), entry).is_some() {
            debug!("Updating existing cache entry: {}", key);
        } else {
            debug!("Inserting new cache entry: {}", key);
        }

        evict_oldest(&mut map, max_entries);
        self.save_map(&map).await;
    }

    /// Delete one entry, returning whether it existed
    pub async fn remove(&self, resource_id: &str, language: &str) -> bool {
        let key = CacheKey::new(resource_id, language);
        let _guard = self.op_lock.lock().await;

        let Some(mut map) = self.load_map().await else {
            return false;
        };

        if map.remove(&key).is_some() {
            debug!("Removed cache entry: {}", key);
            self.save_map(&map).await
        } else {
            false
        }
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let _guard = self.op_lock.lock().await;

        match self.kv.remove(CACHE_RECORD).await {
            Ok(()) => info!("Cleared content cache"),
            Err(e) => warn!("Failed to clear content cache: {}", e),
        }
    }

    /// Snapshot of the stored entries
    pub async fn stats(&self) -> CacheStats {
        let _guard = self.op_lock.lock().await;

        let Some(map) = self.load_map().await else {
            return CacheStats::default();
        };

        let mut entries: Vec<(&CacheKey, &CacheEntry)> = map.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.eviction_rank());

        CacheStats {
            count: entries.len(),
            total_bytes: entries.iter().map(|(_, e)| e.size_bytes()).sum(),
            oldest: entries.first().map(|(_, e)| e.created_at),
            newest: entries.last().map(|(_, e)| e.created_at),
            entries: entries
                .into_iter()
                .map(|(key, entry)| EntryStats {
                    key: key.to_string(),
                    produced_by: entry.produced_by.clone(),
                    size_bytes: entry.size_bytes(),
                    created_at: entry.created_at,
                })
                .collect(),
        }
    }

    /// Internal: read the cache map, `None` when storage failed
    async fn load_map(&self) -> Option<CacheMap> {
        match load_record::<CacheMap>(self.kv.as_ref(), CACHE_RECORD).await {
            Ok(map) => Some(map.unwrap_or_default()),
            Err(e) => {
                warn!("Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Internal: write the cache map back, returning whether it stuck
    async fn save_map(&self, map: &CacheMap) -> bool {
        match save_record(self.kv.as_ref(), CACHE_RECORD, map).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache write failed, dropping update: {}", e);
                false
            }
        }
    }
}

/// Remove the oldest entries until at most `max_entries` remain
fn evict_oldest(map: &mut CacheMap, max_entries: usize) {
    if map.len() <= max_entries {
        return;
    }

    let mut ranked: Vec<(CacheKey, (chrono::DateTime<Utc>, u64))> = map
        .iter()
        .map(|(key, entry)| (key.clone(), entry.eviction_rank()))
        .collect();
    ranked.sort_by(|a, b| a.1.cmp(&b.1));

    let excess = map.len() - max_entries;
    for (key, _) in ranked.into_iter().take(excess) {
        debug!("Evicting entry due to max_entries limit: {}", key);
        map.remove(&key);
    }
}
