//! Storage layer for occdb
//!
//! This crate implements the ground-truth store that transactions read
//! through and commit into:
//! - MemoryStore: BTreeMap-based storage with RwLock
//!
//! The store knows nothing about transactions. Commit serialization is the
//! engine's job; the store only guarantees that each call, and each write
//! batch, is applied atomically.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;

pub use memory::MemoryStore;
