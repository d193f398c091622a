//! Transaction view for OCC
//!
//! A `TransactionView` is the private, buffered window a transaction
//! executes against during its read phase. It intercepts reads and writes:
//!
//! - Writes go to a private `copies` buffer and never touch the store
//! - Reads record the key in the read set, then consult the buffer, then
//!   fall through to the store
//!
//! Nothing a view does is observable outside it until the engine validates
//! the transaction and calls [`TransactionView::commit_into`].

use occ_core::{Key, Result, Storage, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Private, buffered view of the store for one transaction attempt
///
/// # Read-Your-Writes Semantics
///
/// When reading a key, the view:
/// 1. Adds the key to `read_set`, unconditionally (even for keys this
///    view already wrote)
/// 2. Returns the buffered value from `copies` if present
/// 3. Otherwise reads the store, propagating `KeyNotFound`
///
/// # Write Set
///
/// The write set is the key set of `copies`. Writing the same key twice
/// keeps only the last value; there is no log of intermediate values.
///
/// # Lifecycle
///
/// Created at the start of an attempt and never reused. A committed view is
/// moved into the transaction log so later validations can inspect its
/// write set; an aborted view is simply dropped.
pub struct TransactionView {
    /// Attempt identifier, unique per database
    pub txn_id: u64,

    /// Store for fall-through reads
    store: Arc<dyn Storage>,

    /// Buffered writes (last write wins)
    copies: HashMap<Key, Value>,

    /// Every key read through this view
    read_set: HashSet<Key>,

    /// When this view was created
    start_time: Instant,
}

impl TransactionView {
    /// Create an empty view over `store`
    pub fn new(txn_id: u64, store: Arc<dyn Storage>) -> Self {
        TransactionView {
            txn_id,
            store,
            copies: HashMap::new(),
            read_set: HashSet::new(),
            start_time: Instant::now(),
        }
    }

    // === Read/Write Operations ===

    /// Read a key through the view
    ///
    /// # Errors
    /// Returns `Error::KeyNotFound` if the key is neither buffered in this
    /// view nor present in the store. The key is still recorded in the read
    /// set: observing absence is a read too.
    pub fn read(&mut self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        let buffered = self.copies.get(&key).cloned();
        let value = match buffered {
            Some(value) => Ok(value),
            None => self.store.read(&key),
        };
        self.read_set.insert(key);
        value
    }

    /// Buffer a write
    ///
    /// The store is untouched and the read set is unaffected.
    pub fn write(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        self.copies.insert(key.into(), value.into());
    }

    // === Read/Write Sets ===

    /// Snapshot of the keys buffered for writing
    pub fn get_write_set(&self) -> HashSet<Key> {
        self.copies.keys().cloned().collect()
    }

    /// Snapshot of every key read so far
    pub fn get_read_set(&self) -> HashSet<Key> {
        self.read_set.clone()
    }

    /// Borrow the read set without copying it
    pub fn read_set(&self) -> &HashSet<Key> {
        &self.read_set
    }

    /// Iterate the write set without copying it
    pub fn write_keys(&self) -> impl Iterator<Item = &Key> {
        self.copies.keys()
    }

    /// Check whether this view buffered a write for `key`
    pub fn writes_key(&self, key: &Key) -> bool {
        self.copies.contains_key(key)
    }

    /// Look at a buffered value without recording a read
    pub fn buffered(&self, key: &Key) -> Option<&Value> {
        self.copies.get(key)
    }

    // === Commit ===

    /// Apply every buffered write to `store`
    ///
    /// Called exactly once, by the transaction log, after validation passed
    /// and while the commit lock is held. Distinct keys carry no ordering
    /// dependency.
    pub fn commit_into(&self, store: &dyn Storage) {
        let entries: Vec<(Key, Value)> = self
            .copies
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        store.write_batch(entries);
    }

    // === Introspection ===

    /// Get the number of keys in the read set
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Get the number of keys in the write set
    pub fn write_count(&self) -> usize {
        self.copies.len()
    }

    /// Check if this view buffered no writes
    ///
    /// Committing a read-only view still consumes a transaction number.
    pub fn is_read_only(&self) -> bool {
        self.copies.is_empty()
    }

    /// Get the elapsed time since the view was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl fmt::Debug for TransactionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionView")
            .field("txn_id", &self.txn_id)
            .field("copies", &self.copies)
            .field("read_set", &self.read_set)
            .finish_non_exhaustive()
    }
}
