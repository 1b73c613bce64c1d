//! Local object storage for Drift groups.
//!
//! This crate defines the [`StorageBackend`] trait a group store persists
//! objects through, along with two concrete backends:
//!
//! - [`MemoryStore`]: in-memory storage backed by a `RwLock<HashMap>`.
//! - [`FileStore`]: one JSON file per key, named by the hex encoding of the key.
//!
//! [`open_backend`] picks one from a [`StoreConfig`](drift_types::StoreConfig).

mod error;
mod file_store;
mod memory_store;
mod traits;

use std::sync::Arc;

use drift_types::{StoreBackendKind, StoreConfig};

pub use error::StoreError;
pub use file_store::{FileStore, decode_key, encode_key};
pub use memory_store::MemoryStore;
pub use traits::StorageBackend;

/// Open the backend selected by `config` for group `gid`.
///
/// File backends live under `{root}/{gid}` so groups never share a directory.
pub fn open_backend(config: &StoreConfig, gid: &str) -> Result<Arc<dyn StorageBackend>, StoreError> {
    match config.backend {
        StoreBackendKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackendKind::File => Ok(Arc::new(FileStore::new(config.root.join(encode_key(gid)))?)),
    }
}
