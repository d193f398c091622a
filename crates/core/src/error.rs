//! Error types for occdb
//!
//! Every fallible operation returns [`Result`]. A validation abort is NOT an
//! error: `validate_and_write_phase` reports it as `Ok(false)`.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::types::Key;
use std::io;
use thiserror::Error;

/// Result type alias for occdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for occdb
#[derive(Debug, Error)]
pub enum Error {
    /// Read of a key that was never written, neither in a transaction's
    /// buffer nor in the store
    #[error("Key not found: {0}")]
    KeyNotFound(Key),

    /// A transaction number outside `1..=tnc` was looked up in the log
    #[error("Invalid transaction number {tn}: committed range is 1..={tnc}")]
    InvalidTransactionNumber {
        /// Requested transaction number
        tn: u64,
        /// Current transaction counter
        tnc: u64,
    },

    /// Phases of a transaction attempt were called out of order
    #[error("Protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// Configuration could not be parsed or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Convenience constructor for [`Error::ProtocolMisuse`]
    pub fn misuse(msg: impl Into<String>) -> Self {
        Error::ProtocolMisuse(msg.into())
    }

    /// Check whether this is a missing-key failure
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound(_))
    }
}
