//! Serial database: a store plus the history of transactions committed to it
//!
//! `SerialDatabase` owns the three pieces of shared state:
//! - the ground-truth [`MemoryStore`]
//! - the [`TransactionLog`] (counter + committed views)
//! - the commit lock around the log
//!
//! The log lives inside a `parking_lot::Mutex`. Every validate-and-commit
//! step holds that mutex from reading `finish_tn` through appending to the
//! log and flushing into the store, so the serialization order of committed
//! transactions is exactly the order in which they acquire the lock.
//!
//! Read phases never take the commit lock. They only touch their own view
//! and take brief read locks on the store.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use occ_concurrency::{OccConfig, TransactionLog, TransactionView, ValidationResult};
use occ_core::{Key, Result, Storage, Value};
use occ_storage::MemoryStore;

use crate::executor::SerialTransactionExecutor;
use crate::metrics::{MetricCounters, TransactionMetrics};

/// Outcome of a single attempt run by [`SerialDatabase::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Validation passed and the writes are in the store
    Committed {
        /// Transaction number assigned at commit
        tn: u64,
    },
    /// Validation found a conflict; nothing reached the store
    Aborted {
        /// The failed validation
        validation: ValidationResult,
    },
}

impl CommitOutcome {
    /// Check if the attempt committed
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    /// Transaction number, if committed
    pub fn tn(&self) -> Option<u64> {
        match self {
            CommitOutcome::Committed { tn } => Some(*tn),
            CommitOutcome::Aborted { .. } => None,
        }
    }
}

/// Key-value database with serial-validation optimistic concurrency control
///
/// # Example
///
/// ```
/// use occ_engine::SerialDatabase;
///
/// let db = SerialDatabase::new();
/// let mut init = db.begin(|view| {
///     view.write("x", 0);
///     Ok(())
/// });
/// init.read_phase().unwrap();
/// assert!(init.validate_and_write_phase().unwrap());
/// assert_eq!(db.current_tn(), 1);
/// ```
pub struct SerialDatabase {
    /// Ground truth
    pub(crate) store: Arc<MemoryStore>,
    /// Counter and committed views, guarded by the commit lock
    pub(crate) log: Mutex<TransactionLog>,
    /// Validation settings
    pub(crate) config: OccConfig,
    /// Attempt identifiers
    next_txn_id: AtomicU64,
    /// Lifecycle counters
    pub(crate) metrics: MetricCounters,
}

impl SerialDatabase {
    /// Create an empty database with default configuration
    pub fn new() -> Self {
        Self::with_config(OccConfig::default())
    }

    /// Create an empty database with the given configuration
    pub fn with_config(config: OccConfig) -> Self {
        debug!(
            target: "occ::txn",
            validation = config.validation.as_str(),
            report_all_conflicts = config.report_all_conflicts,
            "Database created"
        );
        Self {
            store: Arc::new(MemoryStore::new()),
            log: Mutex::new(TransactionLog::new()),
            config,
            next_txn_id: AtomicU64::new(1),
            metrics: MetricCounters::default(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &OccConfig {
        &self.config
    }

    // === Transaction lifecycle ===

    /// Begin a transaction attempt
    ///
    /// Captures `start_tn` now, before the read phase runs. `txn` is stored
    /// uninvoked until [`SerialTransactionExecutor::read_phase`].
    pub fn begin<F>(&self, txn: F) -> SerialTransactionExecutor<'_, F>
    where
        F: FnOnce(&mut TransactionView) -> Result<()>,
    {
        SerialTransactionExecutor::new(self, txn)
    }

    /// Run one attempt end to end: begin, read phase, validate-and-write
    ///
    /// There is no retry. An `Aborted` outcome means the caller may start a
    /// fresh attempt.
    ///
    /// # Errors
    /// Propagates any error returned by `txn` (for example `KeyNotFound`).
    pub fn execute<F>(&self, txn: F) -> Result<CommitOutcome>
    where
        F: FnOnce(&mut TransactionView) -> Result<()>,
    {
        let mut attempt = self.begin(txn);
        attempt.read_phase()?;
        if attempt.validate_and_write_phase()? {
            let tn = attempt
                .commit_tn()
                .ok_or_else(|| occ_core::Error::misuse("committed attempt has no tn"))?;
            Ok(CommitOutcome::Committed { tn })
        } else {
            let validation = attempt
                .conflict()
                .cloned()
                .ok_or_else(|| occ_core::Error::misuse("aborted attempt has no validation"))?;
            Ok(CommitOutcome::Aborted { validation })
        }
    }

    pub(crate) fn allocate_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Fresh view over the committed store, with a newly allocated id
    pub fn view(&self) -> TransactionView {
        self.new_view(self.allocate_txn_id())
    }

    pub(crate) fn new_view(&self, txn_id: u64) -> TransactionView {
        let store: Arc<dyn Storage> = self.store.clone();
        TransactionView::new(txn_id, store)
    }

    // === Transaction log ===

    /// Number of committed transactions so far
    pub fn current_tn(&self) -> u64 {
        self.log.lock().current_tn()
    }

    /// Committed view with transaction number `tn`
    ///
    /// # Errors
    /// Returns `Error::InvalidTransactionNumber` unless `tn` is in `1..=current_tn()`.
    pub fn transaction(&self, tn: u64) -> Result<Arc<TransactionView>> {
        self.log.lock().get(tn)
    }

    /// Append `view` to the log and flush it into the store, unvalidated
    ///
    /// Takes the commit lock, so it never interleaves with a running
    /// validation. Used to seed initial state; transactions should go
    /// through [`SerialDatabase::begin`]. Not counted in [`metrics`].
    ///
    /// Together with a validated commit this is the only way to change the
    /// store. Every change therefore has a log entry that later validations
    /// see.
    ///
    /// [`metrics`]: SerialDatabase::metrics
    pub fn append_commit(&self, view: TransactionView) -> u64 {
        let txn_id = view.txn_id;
        let tn = self.log.lock().append_commit(view, &*self.store);
        debug!(target: "occ::txn", txn_id, tn, "Appended without validation");
        tn
    }

    // === Committed state ===

    /// Read a committed value directly from the store
    ///
    /// # Errors
    /// Returns `Error::KeyNotFound` if no committed transaction wrote `key`.
    pub fn read(&self, key: impl Into<Key>) -> Result<Value> {
        self.store.read(&key.into())
    }

    /// Consistent copy of the committed store
    pub fn snapshot(&self) -> BTreeMap<Key, Value> {
        self.store.snapshot()
    }

    /// Get transaction metrics
    pub fn metrics(&self) -> TransactionMetrics {
        self.metrics.snapshot()
    }
}

impl Default for SerialDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SerialDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.store, f)
    }
}

impl fmt::Debug for SerialDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialDatabase")
            .field("tnc", &self.log.try_lock().map(|log| log.current_tn()))
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::SerialDatabase: Send, Sync);

    use super::*;
    use occ_concurrency::ValidationStrategy;
    use occ_core::Error;

    #[test]
    fn test_new_database_is_empty() {
        let db = SerialDatabase::new();
        assert_eq!(db.current_tn(), 0);
        assert!(db.snapshot().is_empty());
        assert_eq!(db.to_string(), "{}");
        assert!(matches!(
            db.transaction(1),
            Err(Error::InvalidTransactionNumber { tn: 1, tnc: 0 })
        ));
    }

    #[test]
    fn test_execute_commits() {
        let db = SerialDatabase::new();
        let outcome = db
            .execute(|view| {
                view.write("x", 1);
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed { tn: 1 });
        assert_eq!(outcome.tn(), Some(1));
        assert_eq!(db.read("x").unwrap(), Value::Int(1));
        assert_eq!(db.to_string(), "{x: 1}");
    }

    #[test]
    fn test_execute_propagates_procedure_error() {
        let db = SerialDatabase::new();
        let err = db
            .execute(|view| {
                view.read("missing")?;
                Ok(())
            })
            .unwrap_err();
        assert!(err.is_key_not_found());
        assert_eq!(db.current_tn(), 0);
        assert_eq!(db.metrics().total_failed, 1);
    }

    #[test]
    fn test_read_committed_missing_key() {
        let db = SerialDatabase::new();
        assert!(matches!(db.read("x"), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn test_with_config() {
        let config = OccConfig::default().with_validation(ValidationStrategy::Indexed);
        let db = SerialDatabase::with_config(config.clone());
        assert_eq!(db.config(), &config);
    }

    #[test]
    fn test_append_commit_seeds_state() {
        let db = SerialDatabase::new();
        let mut view = db.view();
        view.write("x", 0);
        view.write("y", 0);

        assert_eq!(db.append_commit(view), 1);
        assert_eq!(db.current_tn(), 1);
        assert_eq!(db.to_string(), "{x: 0, y: 0}");
        assert!(db.transaction(1).unwrap().writes_key(&Key::from("y")));
    }

    #[test]
    fn test_append_commit_is_not_counted() {
        let db = SerialDatabase::new();
        let mut view = db.view();
        view.write("x", 0);
        db.append_commit(view);

        db.execute(|view| {
            view.write("y", 0);
            Ok(())
        })
        .unwrap();

        let m = db.metrics();
        assert_eq!(m.total_committed, 1);
        assert_eq!(db.current_tn(), 2);
    }

    #[test]
    fn test_seeded_write_is_seen_by_validation() {
        let db = SerialDatabase::new();
        let mut seed = db.view();
        seed.write("x", 0);
        db.append_commit(seed);

        let mut attempt = db.begin(|view| {
            let x = view.read("x")?.as_int().unwrap_or_default();
            view.write("x", x + 1);
            Ok(())
        });
        attempt.read_phase().unwrap();

        // Outside change to x while the attempt holds a stale read
        let mut outside = db.view();
        outside.write("x", 100);
        db.append_commit(outside);

        assert!(!attempt.validate_and_write_phase().unwrap());
        assert_eq!(db.read("x").unwrap(), Value::Int(100));
    }

    #[test]
    fn test_txn_ids_are_unique() {
        let db = SerialDatabase::new();
        let a = db.begin(|_| Ok(()));
        let b = db.begin(|_| Ok(()));
        assert_ne!(a.txn_id(), b.txn_id());
    }
}
