//! Serial validation for OCC
//!
//! A transaction that started when the counter read `start_tn` and
//! validates when it reads `finish_tn` must check every transaction that
//! committed in the window `(start_tn, finish_tn]`. If any of those wrote a
//! key this transaction read, it aborts (first committer wins).
//!
//! Key rules:
//! - Conflicts are read-set against committed write-set only
//! - Blind writes (write without read) never conflict
//! - Transactions committed at or before `start_tn` are never consulted
//!
//! Two strategies give the same decision:
//! - [`validate_serial`] scans the log window, one committed write set at a
//!   time. Cost grows with the number of commits that landed during the
//!   read phase.
//! - [`validate_indexed`] asks the [`WriteSetIndex`] for each read key's
//!   most recent committing transaction. Cost grows with the read set.

use crate::log::TransactionLog;
use occ_core::{Key, Result};
use std::collections::{HashMap, HashSet};

/// A read key overwritten by a transaction that committed in the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadWriteConflict {
    /// The key this transaction read
    pub key: Key,
    /// Transaction number of the committed writer
    pub committed_tn: u64,
}

/// Result of transaction validation
///
/// A transaction commits only if `is_valid()` returns true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Counter value observed when the attempt began
    pub start_tn: u64,
    /// Counter value observed when validation ran
    pub finish_tn: u64,
    /// Conflicts detected during validation
    pub conflicts: Vec<ReadWriteConflict>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok(start_tn: u64, finish_tn: u64) -> Self {
        ValidationResult {
            start_tn,
            finish_tn,
            conflicts: Vec::new(),
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Number of transactions that committed during the attempt
    ///
    /// Zero for an inverted window.
    pub fn window_len(&self) -> u64 {
        self.finish_tn.saturating_sub(self.start_tn)
    }

    /// The first conflict found, if any
    pub fn first_conflict(&self) -> Option<&ReadWriteConflict> {
        self.conflicts.first()
    }
}

/// Validate a read set by scanning the committed transactions in
/// `(start_tn, finish_tn]`
///
/// With `report_all` false, the scan stops at the first committed
/// transaction whose write set intersects `read_set`. With `report_all`
/// true, every conflicting `(key, tn)` pair is collected. Conflicts within
/// one transaction are reported in key order.
///
/// # Errors
/// Returns `Error::InvalidTransactionNumber` if the window reaches outside
/// the log. That cannot happen while `finish_tn` is read from the same
/// locked log.
pub fn validate_serial(
    log: &TransactionLog,
    start_tn: u64,
    finish_tn: u64,
    read_set: &HashSet<Key>,
    report_all: bool,
) -> Result<ValidationResult> {
    let mut result = ValidationResult::ok(start_tn, finish_tn);

    for tn in (start_tn + 1)..=finish_tn {
        let committed = log.get(tn)?;

        let mut hits: Vec<&Key> = committed
            .write_keys()
            .filter(|key| read_set.contains(*key))
            .collect();
        if hits.is_empty() {
            continue;
        }
        hits.sort();

        result
            .conflicts
            .extend(hits.into_iter().map(|key| ReadWriteConflict {
                key: key.clone(),
                committed_tn: tn,
            }));

        if !report_all {
            break;
        }
    }

    Ok(result)
}

/// Validate a read set against the key index of committed writes
///
/// A read key conflicts iff the last transaction that wrote it committed
/// after `start_tn`. Since every tn in the index is at most `finish_tn`,
/// this is the same decision [`validate_serial`] makes.
pub fn validate_indexed(
    index: &WriteSetIndex,
    start_tn: u64,
    finish_tn: u64,
    read_set: &HashSet<Key>,
) -> ValidationResult {
    let mut result = ValidationResult::ok(start_tn, finish_tn);

    for key in read_set {
        if let Some(tn) = index.last_writer(key) {
            if tn > start_tn {
                result.conflicts.push(ReadWriteConflict {
                    key: key.clone(),
                    committed_tn: tn,
                });
            }
        }
    }

    result
        .conflicts
        .sort_by(|a, b| (a.committed_tn, &a.key).cmp(&(b.committed_tn, &b.key)));
    result
}

/// Key → most recent committing transaction number
///
/// Maintained by the transaction log on every append.
#[derive(Debug, Default, Clone)]
pub struct WriteSetIndex {
    last_writer: HashMap<Key, u64>,
}

impl WriteSetIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that transaction `tn` wrote `keys`
    ///
    /// Transaction numbers are recorded in increasing order, so the newest
    /// writer always overwrites.
    pub fn record<'a>(&mut self, tn: u64, keys: impl IntoIterator<Item = &'a Key>) {
        for key in keys {
            self.last_writer.insert(key.clone(), tn);
        }
    }

    /// Most recent transaction that wrote `key`
    pub fn last_writer(&self, key: &Key) -> Option<u64> {
        self.last_writer.get(key).copied()
    }

    /// Number of distinct keys ever written by a committed transaction
    pub fn len(&self) -> usize {
        self.last_writer.len()
    }

    /// Check if no committed transaction wrote anything
    pub fn is_empty(&self) -> bool {
        self.last_writer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionView;
    use occ_core::Storage;
    use occ_storage::MemoryStore;
    use std::sync::Arc;

    fn key_set(keys: &[&str]) -> HashSet<Key> {
        keys.iter().map(|k| Key::from(*k)).collect()
    }

    /// Build a log with one committed transaction per entry of `writes`
    fn log_with(writes: &[&[&str]]) -> (TransactionLog, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut log = TransactionLog::new();
        for (i, keys) in writes.iter().enumerate() {
            let mut view = TransactionView::new(i as u64 + 1, store.clone());
            for k in keys.iter() {
                view.write(*k, 1);
            }
            log.append_commit(view, &*store);
        }
        (log, store)
    }

    #[test]
    fn test_empty_window_is_valid() {
        let (log, _store) = log_with(&[&["x"]]);
        let result = validate_serial(&log, 1, 1, &key_set(&["x"]), false).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.window_len(), 0);
    }

    #[test]
    fn test_commits_before_start_are_ignored() {
        let (log, _store) = log_with(&[&["x"], &["y"]]);
        // Started after tn 1, so only tn 2 (writes y) is in the window
        let result = validate_serial(&log, 1, 2, &key_set(&["x"]), false).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_overlap_in_window_conflicts() {
        let (log, _store) = log_with(&[&["x", "y", "z"]]);
        let result = validate_serial(&log, 0, 1, &key_set(&["y"]), false).unwrap();
        assert!(!result.is_valid());
        assert_eq!(
            result.first_conflict(),
            Some(&ReadWriteConflict {
                key: Key::from("y"),
                committed_tn: 1
            })
        );
    }

    #[test]
    fn test_blind_write_does_not_conflict() {
        let (log, _store) = log_with(&[&["x"]]);
        // Reader read nothing, so a concurrent write to x is irrelevant
        let result = validate_serial(&log, 0, 1, &HashSet::new(), false).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_stop_at_first_vs_report_all() {
        let (log, _store) = log_with(&[&["a"], &["b", "c"], &["a"]]);
        let reads = key_set(&["a", "c"]);

        let first = validate_serial(&log, 0, 3, &reads, false).unwrap();
        assert_eq!(first.conflict_count(), 1);
        assert_eq!(first.conflicts[0].committed_tn, 1);

        let all = validate_serial(&log, 0, 3, &reads, true).unwrap();
        let pairs: Vec<(&str, u64)> = all
            .conflicts
            .iter()
            .map(|c| (c.key.as_str(), c.committed_tn))
            .collect();
        assert_eq!(pairs, vec![("a", 1), ("c", 2), ("a", 3)]);
    }

    #[test]
    fn test_window_outside_log_is_an_error() {
        let (log, _store) = log_with(&[&["x"]]);
        let err = validate_serial(&log, 0, 2, &key_set(&["q"]), false).unwrap_err();
        assert!(matches!(
            err,
            occ_core::Error::InvalidTransactionNumber { tn: 2, tnc: 1 }
        ));
    }

    #[test]
    fn test_indexed_matches_serial_decision() {
        let (log, _store) = log_with(&[&["a"], &["b"], &["a", "c"]]);
        for start in 0..=3u64 {
            for reads in [key_set(&["a"]), key_set(&["b"]), key_set(&["c", "d"]), key_set(&[])] {
                let scan = validate_serial(&log, start, 3, &reads, true).unwrap();
                let idx = validate_indexed(log.index(), start, 3, &reads);
                assert_eq!(scan.is_valid(), idx.is_valid(), "start={start} reads={reads:?}");
            }
        }
    }

    #[test]
    fn test_window_len_of_inverted_window_is_zero() {
        assert_eq!(ValidationResult::ok(5, 3).window_len(), 0);
        assert_eq!(ValidationResult::ok(3, 5).window_len(), 2);
    }

    #[test]
    fn test_index_tracks_newest_writer() {
        let mut index = WriteSetIndex::new();
        assert!(index.is_empty());
        index.record(1, [&Key::from("x"), &Key::from("y")]);
        index.record(4, [&Key::from("x")]);
        assert_eq!(index.last_writer(&Key::from("x")), Some(4));
        assert_eq!(index.last_writer(&Key::from("y")), Some(1));
        assert_eq!(index.last_writer(&Key::from("z")), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_log_commit_updates_store() {
        let (_log, store) = log_with(&[&["x"]]);
        assert!(store.contains(&Key::from("x")));
    }
}
