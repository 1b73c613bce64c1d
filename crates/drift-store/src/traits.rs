//! Core trait for local object storage.

use serde_json::Value;

use crate::error::StoreError;

/// Trait for storing and retrieving objects on one node.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Listing is always a success value; absence is `Ok(None)`, never an error.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Retrieve the value under `key`. Returns `None` if not found.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Remove `key`, returning the value it held. Returns `None` if not found.
    async fn delete(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Check whether `key` exists.
    async fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// List all stored keys, in no particular order.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}
