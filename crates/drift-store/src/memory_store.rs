//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::StorageBackend;

/// In-memory object store backed by a `RwLock<HashMap>`.
///
/// Each instance is its own namespace: two stores never share entries.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryStore {
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut map = self.objects.write().expect("lock poisoned");
        debug!(%key, "storing object in memory");
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut map = self.objects.write().expect("lock poisoned");
        let previous = map.remove(key);
        if previous.is_some() {
            debug!(%key, "deleted object from memory");
        }
        Ok(previous)
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }
}
