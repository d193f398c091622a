//! Core types and traits for occdb
//!
//! This crate defines the foundational types used throughout the system:
//! - Key: Opaque string identifier for a storage location
//! - Value: Opaque payload stored under a key
//! - Error: Error taxonomy (missing key, bad transaction number, misuse)
//! - Storage: Trait for the ground-truth key-value map

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use traits::Storage;
pub use types::Key;
pub use value::Value;
