//! Per-key mutual exclusion.
//!
//! [`KeyLocks`] maps each key with a live holder or waiter to its own
//! `tokio::sync::Mutex`. Entries are removed when the last holder releases,
//! so the table only grows with the number of keys currently in use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

type LockTable = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// A table of async locks, one per key.
#[derive(Default)]
pub struct KeyLocks {
    table: LockTable,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let entry = {
            let mut table = self.table.lock().expect("lock poisoned");
            Arc::clone(table.entry(key.to_string()).or_default())
        };
        let guard = entry.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            table: Arc::clone(&self.table),
            _guard: guard,
        }
    }

    /// Whether some task currently holds or waits for `key`.
    pub fn is_locked(&self, key: &str) -> bool {
        self.table.lock().expect("lock poisoned").contains_key(key)
    }

    /// Number of keys with a live holder or waiter.
    pub fn len(&self) -> usize {
        self.table.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one key; released on drop.
pub struct KeyGuard {
    key: String,
    table: LockTable,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    /// The locked key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // The table holds one reference and `_guard` another; anything more
        // is a waiter that still needs the entry.
        if let Ok(mut table) = self.table.lock()
            && let Some(entry) = table.get(&self.key)
            && Arc::strong_count(entry) <= 2
        {
            table.remove(&self.key);
        }
    }
}
