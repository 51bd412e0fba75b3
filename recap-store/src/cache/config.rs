//! Configuration for the content cache

use crate::error::{Result, StoreError};
use crate::kv::{load_record, KvStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name of the settings record supplying the cache limits
pub const SETTINGS_RECORD: &str = "cacheSettings";

/// Limits for the content cache
///
/// Stored in the settings record as `{ "maxEntries": .., "expiryDays": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Maximum number of entries kept after an insert
    pub max_entries: usize,

    /// Entries older than this many days are treated as absent
    pub expiry_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            expiry_days: 1,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(StoreError::Config("max_entries must be at least 1".to_string()));
        }

        if self.expiry_days == 0 {
            return Err(StoreError::Config("expiry_days must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Maximum entry age
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_days))
    }

    /// Raise out-of-range values to their minimum of 1
    pub fn clamped(self) -> Self {
        Self {
            max_entries: self.max_entries.max(1),
            expiry_days: self.expiry_days.max(1),
        }
    }

    /// Load the limits from the settings record
    ///
    /// A missing or unreadable record yields the defaults.
    pub async fn from_settings(kv: &dyn KvStore) -> Self {
        match load_record::<CacheConfig>(kv, SETTINGS_RECORD).await {
            Ok(Some(config)) => {
                if let Err(e) = config.validate() {
                    warn!("Invalid cache settings, raising to minimum: {}", e);
                }
                config.clamped()
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Could not read cache settings, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    max_entries: Option<usize>,
    expiry_days: Option<u32>,
}

impl CacheConfigBuilder {
    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set the expiry window in days
    pub fn expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = Some(days);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            expiry_days: self.expiry_days.unwrap_or(defaults.expiry_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{save_record, MemoryKv};
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.expiry_days, 1);
        assert_eq!(config.expiry(), chrono::Duration::days(1));
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::default().validate().is_ok());

        let invalid = CacheConfig::builder().max_entries(0).build();
        assert!(invalid.validate().is_err());

        let invalid = CacheConfig::builder().expiry_days(0).build();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder().max_entries(5).expiry_days(3).build();
        assert_eq!(config.max_entries, 5);
        assert_eq!(config.expiry_days, 3);
    }

    #[tokio::test]
    async fn test_from_settings_record() {
        let kv = MemoryKv::new();
        kv.set(SETTINGS_RECORD, json!({"maxEntries": 2, "expiryDays": 7}))
            .await
            .unwrap();

        let config = CacheConfig::from_settings(&kv).await;
        assert_eq!(config, CacheConfig::builder().max_entries(2).expiry_days(7).build());
    }

    #[tokio::test]
    async fn test_from_settings_partial_and_invalid() {
        let kv = MemoryKv::new();
        save_record(&kv, SETTINGS_RECORD, &json!({"maxEntries": 0}))
            .await
            .unwrap();

        let stored: CacheConfig = load_record(&kv, SETTINGS_RECORD).await.unwrap().unwrap();
        assert!(stored.validate().is_err());

        let config = CacheConfig::from_settings(&kv).await;
        assert_eq!(config.max_entries, 1);
        assert_eq!(config.expiry_days, 1);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_from_settings_missing_or_corrupt() {
        let kv = MemoryKv::new();
        assert_eq!(CacheConfig::from_settings(&kv).await, CacheConfig::default());

        kv.set(SETTINGS_RECORD, json!("not an object")).await.unwrap();
        assert_eq!(CacheConfig::from_settings(&kv).await, CacheConfig::default());
    }
}
