use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Shared key-value store backing queues, timestamps and user settings.
///
/// Isolation between browsing windows comes purely from key namespacing
/// (see [`keys`]); writes are last-write-wins per key, with no locking
/// discipline beyond what a backend needs for its own consistency.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get(key).await? {
            Some(value) => Ok(serde_json::from_value(value).ok()),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        self.set(key, serde_json::to_value(value)?).await
    }
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}

/// Key templates for persisted state. Window-scoped keys carry the window
/// identifier; the unscoped names are legacy slots kept for backward
/// compatibility with queues saved before windows were isolated.
pub mod keys {
    pub const LEGACY_QUEUE: &str = "currentQueue";
    pub const LEGACY_QUEUE_TIMESTAMP: &str = "queueTimestamp";

    pub fn queue(window_id: &str) -> String {
        format!("currentQueue_{window_id}")
    }

    pub fn queue_timestamp(window_id: &str) -> String {
        format!("queueTimestamp_{window_id}")
    }

    pub fn native_queue(window_id: &str) -> String {
        format!("nativeQueue_{window_id}")
    }

    pub fn native_queue_timestamp(window_id: &str) -> String {
        format!("nativeQueueTimestamp_{window_id}")
    }

    pub fn last_native_url(window_id: &str) -> String {
        format!("lastNativeUrl_{window_id}")
    }
}

/// In-memory store for tests and single-run gathers.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        Ok(())
    }
}

/// File-backed store persisting the whole key map as one JSON document.
/// Every write rewrites the file; concurrent writers are last-write-wins,
/// matching the shared-store model this crate assumes.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn load_map(&self) -> Result<HashMap<String, Value>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if !contents.trim().is_empty() => {
                Ok(serde_json::from_str(&contents)?)
            }
            Ok(_) => Ok(HashMap::new()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_map(&self, map: &HashMap<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.load_map()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.load_map()?;
        map.insert(key.to_string(), value);
        self.save_map(&map)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.load_map()?;
        if map.remove(key).is_some() {
            self.save_map(&map)?;
        }
        Ok(())
    }
}
