//! Durable key-value storage for offline data.
//!
//! This module provides the `KeyValueStore` seam plus two backends:
//! - `FileStore`: one JSON file per key in a data directory
//! - `MemoryStore`: process-local map, for tests and throwaway sessions
//!
//! Values are opaque text; the offline layer owns their format.

pub mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError};
