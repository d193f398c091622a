//! Storage abstraction
//!
//! The store is the ground truth that transactions read through and commit
//! into. It carries no concurrency control of its own beyond making each
//! call thread-safe; commit serialization lives in the engine.

use crate::error::Result;
use crate::types::Key;
use crate::value::Value;

/// Ground-truth key-value map
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). Writers take `&self`, so
/// implementations use interior mutability.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`](crate::Error::KeyNotFound) if the key
    /// was never written. There is no default value.
    fn read(&self, key: &Key) -> Result<Value>;

    /// Unconditionally set `key` to `value`
    fn write(&self, key: Key, value: Value);

    /// Apply a set of writes
    ///
    /// Distinct keys have no ordering dependency. The default applies one
    /// `write` per pair; implementations may apply the whole batch under a
    /// single lock so readers never observe half of it.
    fn write_batch(&self, entries: Vec<(Key, Value)>) {
        for (key, value) in entries {
            self.write(key, value);
        }
    }

    /// Check whether `key` has ever been written
    fn contains(&self, key: &Key) -> bool;

    /// Number of keys in the store
    fn len(&self) -> usize;

    /// Check if the store holds no keys
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
