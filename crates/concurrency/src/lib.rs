//! Concurrency layer for occdb
//!
//! This crate implements the pieces of serial optimistic concurrency control:
//! - TransactionView: buffered writes, read-set tracking, read-your-writes
//! - TransactionLog: numbered, append-only history of committed views
//! - Validation: read set vs. write sets committed during the read phase
//!   (scan or key-indexed)
//! - OccConfig: validation settings loaded from `occ.toml`
//!
//! The commit lock that makes validate-then-append atomic lives one layer
//! up, in the engine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod transaction;
pub mod validation;

pub use config::{OccConfig, ValidationStrategy, CONFIG_FILE_NAME};
pub use log::TransactionLog;
pub use transaction::TransactionView;
pub use validation::{
    validate_indexed, validate_serial, ReadWriteConflict, ValidationResult, WriteSetIndex,
};
