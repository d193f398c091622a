//! MemoryStore: the ground-truth key-value map
//!
//! This module implements the Storage trait using:
//! - `BTreeMap<Key, Value>` for ordered key storage
//! - `parking_lot::RwLock` for thread-safe access
//!
//! # Design Notes
//!
//! - **No version history**: each key stores only its latest value
//! - **No auto-initialization**: reading a never-written key fails
//! - **Batch writes under one lock**: `write_batch` takes the write lock once,
//!   so a reader never sees half of a committed transaction

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;

use occ_core::{Error, Key, Result, Storage, Value};

/// In-memory storage backend using BTreeMap with RwLock
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Key, Value>>,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the full contents of the store
    ///
    /// Takes the read lock once, so the result is a consistent point-in-time
    /// copy with respect to `write_batch`.
    pub fn snapshot(&self) -> BTreeMap<Key, Value> {
        self.data.read().clone()
    }

    /// All keys currently in the store, in order
    pub fn keys(&self) -> Vec<Key> {
        self.data.read().keys().cloned().collect()
    }
}

impl Storage for MemoryStore {
    fn read(&self, key: &Key) -> Result<Value> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(key.clone()))
    }

    fn write(&self, key: Key, value: Value) {
        self.data.write().insert(key, value);
    }

    fn write_batch(&self, entries: Vec<(Key, Value)>) {
        let count = entries.len();
        let mut data = self.data.write();
        for (key, value) in entries {
            data.insert(key, value);
        }
        tracing::trace!(target: "occ::storage", keys = count, "Applied write batch");
    }

    fn contains(&self, key: &Key) -> bool {
        self.data.read().contains_key(key)
    }

    fn len(&self) -> usize {
        self.data.read().len()
    }
}

impl fmt::Display for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.read();
        write!(f, "{{")?;
        for (i, (key, value)) in data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}
