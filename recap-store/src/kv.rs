//! Key-value persistence used by the cache and the settings records
//!
//! Records are whole JSON documents stored under a fixed name. Two
//! implementations are provided: [`MemoryKv`] for tests and ephemeral runs,
//! and [`FileKv`] which keeps one `<name>.json` file per record.

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Abstract record store
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a record, `None` when it was never written
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace a record
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete a record; deleting a missing record is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode a typed record
pub async fn load_record<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match kv.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and write a typed record
pub async fn save_record<T: Serialize + ?Sized>(kv: &dyn KvStore, key: &str, record: &T) -> Result<()> {
    let value = serde_json::to_value(record)?;
    kv.set(key, value).await
}

/// In-process store backed by a map
#[derive(Default)]
pub struct MemoryKv {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.records.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.records.write().await.remove(key);
        Ok(())
    }
}

/// Store keeping each record as a JSON file inside a directory
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the record files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid record name: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.record_path(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.record_path(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so a crash never leaves a half-written record
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(&value)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Persisted record {:?}", path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.record_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        max_entries: usize,
    }

    #[tokio::test]
    async fn test_memory_kv_roundtrip() {
        let kv = MemoryKv::new();
        assert!(kv.get("missing").await.unwrap().is_none());

        kv.set("a", json!({"x": 1})).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), Some(json!({"x": 1})));

        kv.remove("a").await.unwrap();
        assert!(kv.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_kv_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();

        let kv = FileKv::new(temp_dir.path().join("store"));
        save_record(&kv, "cacheSettings", &Settings { max_entries: 7 })
            .await
            .unwrap();

        let reopened = FileKv::new(temp_dir.path().join("store"));
        let loaded: Option<Settings> = load_record(&reopened, "cacheSettings").await.unwrap();
        assert_eq!(loaded, Some(Settings { max_entries: 7 }));
    }

    #[tokio::test]
    async fn test_file_kv_remove_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let kv = FileKv::new(temp_dir.path());
        kv.remove("never_written").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_kv_rejects_path_like_names() {
        let temp_dir = TempDir::new().unwrap();
        let kv = FileKv::new(temp_dir.path());
        assert!(kv.set("../escape", json!(1)).await.is_err());
        assert!(kv.get("").await.is_err());
    }

    #[tokio::test]
    async fn test_file_kv_corrupt_record_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), b"{oops").unwrap();

        let kv = FileKv::new(temp_dir.path());
        let result = kv.get("broken").await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
