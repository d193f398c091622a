//! occdb - Optimistic concurrency control over an in-memory key-value store
//!
//! Transactions run in three phases. The read phase executes a procedure
//! against a private [`TransactionView`]; writes are buffered and every read
//! key is recorded. Validation then checks, under a single commit lock,
//! that no transaction which committed since this one began wrote a key it
//! read. If the check passes the buffered writes are flushed to the store
//! and the transaction receives the next transaction number; otherwise the
//! attempt aborts and nothing reaches the store.
//!
//! # Quick Start
//!
//! ```
//! use occdb::{SerialDatabase, TransactionView, Result};
//!
//! fn incr(view: &mut TransactionView) -> Result<()> {
//!     let n = view.read("counter")?.as_int().unwrap_or_default();
//!     view.write("counter", n + 1);
//!     Ok(())
//! }
//!
//! let db = SerialDatabase::new();
//! db.execute(|view| {
//!     view.write("counter", 0);
//!     Ok(())
//! })?;
//!
//! let mut a = db.begin(incr);
//! let mut b = db.begin(incr);
//! a.read_phase()?;
//! b.read_phase()?;
//!
//! assert!(a.validate_and_write_phase()?);   // first committer wins
//! assert!(!b.validate_and_write_phase()?);  // read a key `a` overwrote
//! assert_eq!(db.read("counter")?.as_int(), Some(1));
//! # Ok::<(), occdb::Error>(())
//! ```
//!
//! Retrying an aborted attempt is up to the caller: begin a fresh one.

pub use occ_engine::*;
