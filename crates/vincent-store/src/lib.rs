//! Policy directory: the registry's record of registered policy packages.
//!
//! The import pipeline never creates or mutates these records; it only
//! performs two batched reads during dependency resolution. This crate
//! therefore exposes a read-only trait, [`PolicyDirectory`], plus the
//! record types and an in-memory implementation used by tests and
//! embedders. The production document store lives behind the same trait
//! and is out of scope here.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod directory;
pub mod error;

pub use directory::{MemoryPolicyDirectory, PolicyDirectory, PolicyRecord, PolicyVersionRecord};
pub use error::{StoreError, StoreResult};
