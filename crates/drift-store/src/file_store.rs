//! File-based storage backend.
//!
//! Stores one JSON file per key at `{base_dir}/{hex(key)}.json`. The hex
//! encoding is reversible, so distinct keys never share a file and `list`
//! recovers the exact keys that were stored.
//!
//! Encodings longer than [`SEGMENT_LEN`] are split into fixed-length
//! directory segments so no path component exceeds file-name limits:
//! `{base_dir}/{seg0}/{seg1}/.../{rest}.json`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::traits::StorageBackend;

const EXTENSION: &str = ".json";

/// Maximum hex characters per path component. Every directory segment is
/// exactly this long; the file stem holds the remainder.
pub const SEGMENT_LEN: usize = 200;

/// Encode a key as lowercase hex of its UTF-8 bytes.
pub fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() * 2);
    for byte in key.as_bytes() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Inverse of [`encode_key`].
pub fn decode_key(encoded: &str) -> Result<String, StoreError> {
    let invalid = || StoreError::InvalidKeyEncoding(encoded.to_string());
    let raw = encoded.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(invalid());
    }
    let mut bytes = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks(2) {
        let hi = hex_nibble(pair[0]).ok_or_else(invalid)?;
        let lo = hex_nibble(pair[1]).ok_or_else(invalid)?;
        bytes.push((hi << 4) | lo);
    }
    String::from_utf8(bytes).map_err(|_| invalid())
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// File-based object store.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place, so a crash never leaves a half-written object.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Directory holding this store's files.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Compute the full file path for a key.
    fn object_path(&self, key: &str) -> PathBuf {
        let encoded = encode_key(key);
        let mut path = self.base_dir.clone();
        let mut rest = encoded.as_str();
        while rest.len() > SEGMENT_LEN {
            let (segment, tail) = rest.split_at(SEGMENT_LEN);
            path.push(segment);
            rest = tail;
        }
        path.push(format!("{rest}{EXTENSION}"));
        path
    }

    async fn read_value(path: &Path) -> Result<Option<Value>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for FileStore {
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.object_path(key);
        let data = serde_json::to_vec(&value)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(%key, path = %path.display(), size = data.len(), "stored object to file");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Self::read_value(&self.object_path(key)).await
    }

    async fn delete(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.object_path(key);
        let Some(previous) = Self::read_value(&path).await? else {
            return Ok(None);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%key, "deleted object file");
                Ok(Some(previous))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        match tokio::fs::metadata(self.object_path(key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();

        // Walk segment directories: each level contributes a SEGMENT_LEN prefix.
        let mut pending = vec![(self.base_dir.clone(), String::new())];
        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    if name.len() == SEGMENT_LEN && name.bytes().all(|b| hex_nibble(b).is_some()) {
                        pending.push((entry.path(), format!("{prefix}{name}")));
                    }
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }
                let Some(stem) = name.strip_suffix(EXTENSION) else {
                    continue;
                };
                match decode_key(&format!("{prefix}{stem}")) {
                    Ok(key) => keys.push(key),
                    Err(e) => {
                        warn!(file = ?entry.path(), error = %e, "skipping foreign file in store")
                    }
                }
            }
        }
        Ok(keys)
    }
}
