//! # recap-store
//!
//! Storage layer for the recap job service.
//!
//! ## Features
//!
//! - Content cache keyed by resource and language, with day-based expiry and count-bounded eviction
//! - Conversation context store holding the latest history per session
//! - Pluggable key-value persistence (in-memory or one JSON file per record)
//!
//! ## Persisted layout
//!
//! | record          | contents                                   |
//! |-----------------|--------------------------------------------|
//! | `summaryCache`  | the whole cache map, keyed `resource|lang` |
//! | `cacheSettings` | `{ "maxEntries": .., "expiryDays": .. }`   |
//!
//! ```no_run
//! use recap_store::{ContentCache, FileKv};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let kv = Arc::new(FileKv::new("./data/store"));
//!     let cache = ContentCache::from_settings(kv).await;
//!
//!     let stats = cache.stats().await;
//!     println!("{} cached entries, {} bytes", stats.count, stats.total_bytes);
//! }
//! ```

pub mod cache;
pub mod conversation;
pub mod error;
pub mod kv;
pub mod message;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheStats, CachedPayload,
    ContentCache, EntryStats,
};
pub use conversation::ConversationStore;
pub use error::{Result, StoreError};
pub use kv::{FileKv, KvStore, MemoryKv};
pub use message::{ChatMessage, Role};
