//! Transaction attempt lifecycle
//!
//! A [`SerialTransactionExecutor`] drives one attempt through the three
//! phases of optimistic concurrency control:
//!
//! ```text
//! begin()                     start_tn = current tn, fresh view     -> Created
//! read_phase()                txn(view), exactly once               -> ReadPhaseDone
//! validate_and_write_phase()  under the commit lock:
//!                               finish_tn = current tn
//!                               check (start_tn, finish_tn]
//!                               conflict -> Aborted, return false
//!                               else append + flush -> Committed, return true
//! ```
//!
//! Attempts are single-use. Calling a phase out of order, or on a terminal
//! attempt, is `Error::ProtocolMisuse`. A validation abort is not an error.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use occ_concurrency::{
    validate_indexed, validate_serial, TransactionView, ValidationResult, ValidationStrategy,
};
use occ_core::{Error, Key, Result};

use crate::database::SerialDatabase;

/// Why an attempt ended in `Aborted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Validation found a read key overwritten during the read phase
    Conflict(ValidationResult),
    /// The transaction procedure returned an error during the read phase
    ProcedureFailed(String),
    /// Validation hit an internal inconsistency
    Fatal(String),
}

/// State of a transaction attempt
///
/// State transitions:
/// - `Created` → `ReadPhaseDone` (procedure returned Ok)
/// - `Created` → `Aborted` (procedure returned Err)
/// - `ReadPhaseDone` → `Committed` (validation passed)
/// - `ReadPhaseDone` → `Aborted` (conflict detected)
///
/// Terminal states (no transitions allowed):
/// - `Committed`
/// - `Aborted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    /// Begun; the procedure has not run yet
    Created,
    /// The procedure ran; awaiting validation
    ReadPhaseDone,
    /// Validated and written
    Committed {
        /// Transaction number assigned at commit
        tn: u64,
    },
    /// Discarded; nothing reached the store
    Aborted {
        /// Why the attempt was discarded
        reason: AbortReason,
    },
}

impl AttemptStatus {
    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Committed { .. } | AttemptStatus::Aborted { .. }
        )
    }
}

/// One attempt at running a transaction procedure
///
/// Borrowing the database for `'db` lets read phases of many attempts run
/// on scoped threads at once; only `validate_and_write_phase` serializes.
pub struct SerialTransactionExecutor<'db, F> {
    db: &'db SerialDatabase,
    txn_id: u64,
    start_tn: u64,
    /// Owned until commit moves it into the log
    view: Option<TransactionView>,
    /// Taken by the read phase
    txn: Option<F>,
    status: AttemptStatus,
}

impl<'db, F> SerialTransactionExecutor<'db, F>
where
    F: FnOnce(&mut TransactionView) -> Result<()>,
{
    pub(crate) fn new(db: &'db SerialDatabase, txn: F) -> Self {
        let txn_id = db.allocate_txn_id();
        let start_tn = db.current_tn();
        db.metrics.record_start();

        debug!(target: "occ::txn", txn_id, start_tn, "Transaction started");

        Self {
            db,
            txn_id,
            start_tn,
            view: Some(db.new_view(txn_id)),
            txn: Some(txn),
            status: AttemptStatus::Created,
        }
    }

    /// Run the transaction procedure against the private view
    ///
    /// # Errors
    /// - `Error::ProtocolMisuse` if the read phase already ran
    /// - Whatever the procedure returns; the attempt is then `Aborted`
    pub fn read_phase(&mut self) -> Result<()> {
        if !matches!(self.status, AttemptStatus::Created) {
            return Err(Error::misuse(format!(
                "Transaction {} cannot run its read phase from {:?}",
                self.txn_id, self.status
            )));
        }

        let txn = self
            .txn
            .take()
            .ok_or_else(|| Error::misuse(format!("Transaction {} has no procedure", self.txn_id)))?;
        let view = self
            .view
            .as_mut()
            .ok_or_else(|| Error::misuse(format!("Transaction {} has no view", self.txn_id)))?;

        match txn(view) {
            Ok(()) => {
                debug!(
                    target: "occ::txn",
                    txn_id = self.txn_id,
                    reads = view.read_count(),
                    writes = view.write_count(),
                    elapsed_us = view.elapsed().as_micros() as u64,
                    "Read phase finished"
                );
                self.status = AttemptStatus::ReadPhaseDone;
                Ok(())
            }
            Err(e) => {
                warn!(
                    target: "occ::txn",
                    txn_id = self.txn_id,
                    error = %e,
                    "Transaction procedure failed"
                );
                self.status = AttemptStatus::Aborted {
                    reason: AbortReason::ProcedureFailed(e.to_string()),
                };
                self.view = None;
                self.db.metrics.record_failure();
                Err(e)
            }
        }
    }

    /// Validate against every commit since `start_tn` and, if clean, commit
    ///
    /// Runs entirely under the database's commit lock. Returns `Ok(true)` if
    /// the transaction committed and `Ok(false)` if it aborted; an abort
    /// leaves the store untouched.
    ///
    /// # Errors
    /// - `Error::ProtocolMisuse` before the read phase or on a terminal attempt
    /// - `Error::InvalidTransactionNumber` if the log is inconsistent
    pub fn validate_and_write_phase(&mut self) -> Result<bool> {
        match &self.status {
            AttemptStatus::ReadPhaseDone => {}
            AttemptStatus::Created => {
                return Err(Error::misuse(format!(
                    "Transaction {} validated before its read phase",
                    self.txn_id
                )))
            }
            terminal => {
                return Err(Error::misuse(format!(
                    "Transaction {} is already {:?}",
                    self.txn_id, terminal
                )))
            }
        }

        let db = self.db;
        let mut log = db.log.lock();
        let finish_tn = log.current_tn();

        let view = self
            .view
            .as_ref()
            .ok_or_else(|| Error::misuse(format!("Transaction {} has no view", self.txn_id)))?;

        let validation = match db.config.validation {
            ValidationStrategy::Scan => validate_serial(
                &log,
                self.start_tn,
                finish_tn,
                view.read_set(),
                db.config.report_all_conflicts,
            ),
            ValidationStrategy::Indexed => Ok(validate_indexed(
                log.index(),
                self.start_tn,
                finish_tn,
                view.read_set(),
            )),
        };

        let validation = match validation {
            Ok(v) => v,
            Err(e) => {
                drop(log);
                self.status = AttemptStatus::Aborted {
                    reason: AbortReason::Fatal(e.to_string()),
                };
                self.view = None;
                db.metrics.record_abort();
                return Err(e);
            }
        };

        if !validation.is_valid() {
            drop(log);
            warn!(
                target: "occ::txn",
                txn_id = self.txn_id,
                start_tn = self.start_tn,
                finish_tn,
                conflicts = validation.conflict_count(),
                key = %validation.first_conflict().map(|c| c.key.as_str()).unwrap_or(""),
                "Transaction aborted"
            );
            self.status = AttemptStatus::Aborted {
                reason: AbortReason::Conflict(validation),
            };
            self.view = None;
            db.metrics.record_abort();
            return Ok(false);
        }

        let view = self
            .view
            .take()
            .ok_or_else(|| Error::misuse(format!("Transaction {} has no view", self.txn_id)))?;
        let tn = log.append_commit(view, &*db.store);
        drop(log);

        info!(target: "occ::txn", txn_id = self.txn_id, tn, "Transaction committed");
        self.status = AttemptStatus::Committed { tn };
        db.metrics.record_commit();
        Ok(true)
    }

    // === Introspection ===

    /// Attempt identifier
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Counter value observed when the attempt began
    pub fn start_tn(&self) -> u64 {
        self.start_tn
    }

    /// Current state
    pub fn status(&self) -> &AttemptStatus {
        &self.status
    }

    /// The private view, while this attempt still owns it
    ///
    /// After commit the view lives in the log (see
    /// [`SerialDatabase::transaction`]); after abort it is gone.
    pub fn view(&self) -> Option<&TransactionView> {
        self.view.as_ref()
    }

    /// Snapshot of the read set, while the view is owned
    pub fn read_set(&self) -> Option<HashSet<Key>> {
        self.view.as_ref().map(TransactionView::get_read_set)
    }

    /// Snapshot of the write set, while the view is owned
    pub fn write_set(&self) -> Option<HashSet<Key>> {
        self.view.as_ref().map(TransactionView::get_write_set)
    }

    /// Transaction number, if committed
    pub fn commit_tn(&self) -> Option<u64> {
        match self.status {
            AttemptStatus::Committed { tn } => Some(tn),
            _ => None,
        }
    }

    /// Check if the attempt committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, AttemptStatus::Committed { .. })
    }

    /// Check if the attempt aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, AttemptStatus::Aborted { .. })
    }

    /// Why the attempt aborted, if it did
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.status {
            AttemptStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }

    /// The failed validation, if the attempt aborted on a conflict
    pub fn conflict(&self) -> Option<&ValidationResult> {
        match &self.status {
            AttemptStatus::Aborted {
                reason: AbortReason::Conflict(validation),
            } => Some(validation),
            _ => None,
        }
    }
}

impl<F> Drop for SerialTransactionExecutor<'_, F> {
    fn drop(&mut self) {
        if !self.status.is_terminal() {
            debug!(
                target: "occ::txn",
                txn_id = self.txn_id,
                "Transaction dropped before completion"
            );
            self.db.metrics.record_abandon();
        }
    }
}
