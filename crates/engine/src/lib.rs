//! Transaction engine for occdb
//!
//! This crate ties the lower layers together:
//! - Database: store, transaction log, and the commit lock
//! - Executor: one attempt through read, validation, and write phases
//! - Metrics: lifecycle counters
//!
//! Read phases run concurrently against private views. Validation and the
//! write phase run one transaction at a time under the commit lock, so the
//! committed history is equivalent to running the committed transactions
//! serially in transaction-number order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod executor;
pub mod metrics;

pub use database::{CommitOutcome, SerialDatabase};
pub use executor::{AbortReason, AttemptStatus, SerialTransactionExecutor};
pub use metrics::TransactionMetrics;

pub use occ_concurrency::{
    OccConfig, ReadWriteConflict, TransactionLog, TransactionView, ValidationResult,
    ValidationStrategy, CONFIG_FILE_NAME,
};
pub use occ_core::{Error, Key, Result, Storage, Value};
pub use occ_storage::MemoryStore;
