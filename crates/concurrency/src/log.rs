//! Transaction log: the ordered history of committed transactions
//!
//! Each committed transaction gets the next transaction number (tn),
//! starting at 1. Tn 0 means "before any transaction". The log is
//! append-only: entries are never removed or mutated once inserted, and the
//! set of numbers in the log is always exactly `1..=tnc`.
//!
//! Committed views are retained so that later validations can inspect
//! their write sets. Memory therefore grows with the number of commits.
//!
//! The log itself is not synchronized. The engine keeps it behind the commit
//! lock so that reading the counter, validating, and appending are one
//! critical section.

use crate::transaction::TransactionView;
use crate::validation::WriteSetIndex;
use occ_core::{Error, Result, Storage};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Append-only history of committed transactions
#[derive(Debug, Default)]
pub struct TransactionLog {
    /// Transaction counter: number of commits so far
    tnc: u64,
    /// tn → committed view
    transactions: BTreeMap<u64, Arc<TransactionView>>,
    /// Key → newest committing tn, for indexed validation
    index: WriteSetIndex,
}

impl TransactionLog {
    /// Create an empty log (`current_tn() == 0`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed transactions so far
    pub fn current_tn(&self) -> u64 {
        self.tnc
    }

    /// Fetch the committed view with transaction number `tn`
    ///
    /// # Errors
    /// Returns `Error::InvalidTransactionNumber` unless `tn` is in `1..=tnc`.
    pub fn get(&self, tn: u64) -> Result<Arc<TransactionView>> {
        self.transactions
            .get(&tn)
            .cloned()
            .ok_or(Error::InvalidTransactionNumber { tn, tnc: self.tnc })
    }

    /// Commit `view`: assign the next tn, record it, and flush it into `store`
    ///
    /// This is the sole mutator of the counter and the log. The caller must
    /// hold the commit lock so that nobody observes the counter advanced
    /// without the matching store writes.
    ///
    /// Returns the assigned transaction number.
    pub fn append_commit(&mut self, view: TransactionView, store: &dyn Storage) -> u64 {
        self.tnc += 1;
        let tn = self.tnc;
        debug_assert!(!self.transactions.contains_key(&tn));

        self.index.record(tn, view.write_keys());
        view.commit_into(store);
        self.transactions.insert(tn, Arc::new(view));
        tn
    }

    /// Key index over committed write sets
    pub fn index(&self) -> &WriteSetIndex {
        &self.index
    }

    /// Iterate committed views in commit order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Arc<TransactionView>)> {
        self.transactions.iter().map(|(tn, view)| (*tn, view))
    }

    /// Number of entries in the log (always equal to `current_tn()`)
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if nothing has committed
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occ_core::{Key, Value};
    use occ_storage::MemoryStore;

    fn view_writing(
        store: &Arc<MemoryStore>,
        txn_id: u64,
        entries: &[(&str, i64)],
    ) -> TransactionView {
        let mut view = TransactionView::new(txn_id, store.clone());
        for (k, v) in entries {
            view.write(*k, *v);
        }
        view
    }

    #[test]
    fn test_new_log_is_empty() {
        let log = TransactionLog::new();
        assert_eq!(log.current_tn(), 0);
        assert!(log.is_empty());
        assert!(matches!(
            log.get(0),
            Err(Error::InvalidTransactionNumber { tn: 0, tnc: 0 })
        ));
    }

    #[test]
    fn test_append_assigns_consecutive_numbers() {
        let store = Arc::new(MemoryStore::new());
        let mut log = TransactionLog::new();

        let tn1 = log.append_commit(view_writing(&store, 10, &[("x", 1)]), &*store);
        let tn2 = log.append_commit(view_writing(&store, 11, &[("y", 2)]), &*store);

        assert_eq!((tn1, tn2), (1, 2));
        assert_eq!(log.current_tn(), 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(1).unwrap().txn_id, 10);
        assert_eq!(log.get(2).unwrap().txn_id, 11);
        let tns: Vec<u64> = log.iter().map(|(tn, _)| tn).collect();
        assert_eq!(tns, vec![1, 2]);
    }

    #[test]
    fn test_append_flushes_into_store() {
        let store = Arc::new(MemoryStore::new());
        let mut log = TransactionLog::new();

        log.append_commit(view_writing(&store, 1, &[("x", 1), ("y", 2)]), &*store);

        assert_eq!(store.read(&Key::from("x")).unwrap(), Value::Int(1));
        assert_eq!(store.read(&Key::from("y")).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_get_out_of_range() {
        let store = Arc::new(MemoryStore::new());
        let mut log = TransactionLog::new();
        log.append_commit(view_writing(&store, 1, &[("x", 1)]), &*store);

        assert!(log.get(1).is_ok());
        assert!(matches!(
            log.get(2),
            Err(Error::InvalidTransactionNumber { tn: 2, tnc: 1 })
        ));
    }

    #[test]
    fn test_read_only_commit_consumes_a_number() {
        let store = Arc::new(MemoryStore::new());
        let mut log = TransactionLog::new();

        let tn = log.append_commit(view_writing(&store, 1, &[]), &*store);
        assert_eq!(tn, 1);
        assert!(log.get(1).unwrap().is_read_only());
        assert!(log.index().is_empty());
    }

    #[test]
    fn test_index_follows_appends() {
        let store = Arc::new(MemoryStore::new());
        let mut log = TransactionLog::new();
        log.append_commit(view_writing(&store, 1, &[("x", 1)]), &*store);
        log.append_commit(view_writing(&store, 2, &[("x", 2), ("y", 2)]), &*store);

        assert_eq!(log.index().last_writer(&Key::from("x")), Some(2));
        assert_eq!(log.index().last_writer(&Key::from("y")), Some(2));
    }
}
