//! # Content Cache
//!
//! Maps `(resource identifier, language variant)` to a previously generated
//! text so repeated requests skip the model backend.
//!
//! ## Features
//!
//! - **Lazy expiry**: entries older than `expiry_days` are deleted when read
//! - **Count bound**: after each insert the oldest entries beyond `max_entries` are evicted
//! - **Exact keys**: no fuzzy matching across resources or languages
//! - **Best-effort**: storage failures degrade to misses and dropped writes
//!
//! ## Example
//!
//! ```rust
//! use recap_store::cache::{CacheConfig, ContentCache};
//! use recap_store::kv::MemoryKv;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = CacheConfig::builder().max_entries(50).expiry_days(2).build();
//! let cache = ContentCache::new(Arc::new(MemoryKv::new()), config);
//!
//! cache.set("https://example.com/post", "en", "A short summary.", "gpt-4o-mini").await;
//!
//! if let Some(summary) = cache.get("https://example.com/post", "en").await {
//!     println!("Cache hit: {}", summary);
//! }
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, SETTINGS_RECORD};
pub use entry::CacheEntry;
pub use store::ContentCache;
pub use types::{CacheKey, CacheStats, CachedPayload, EntryStats, CACHE_RECORD};
