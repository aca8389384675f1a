//! File-backed document store.
//!
//! The store resolves tool-supplied filenames and moves packages between disk
//! and memory. Saves go through a temporary file so a failed write never
//! truncates an existing document.

pub mod fs;

pub use fs::{DocumentStore, StoreError, StoreResult};
