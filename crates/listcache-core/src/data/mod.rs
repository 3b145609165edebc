//! Data-access layer for shopping lists.
//!
//! `ListService` is what callers use: reads go to the network and fall back
//! to the cached snapshot, writes go to the network and fall back to the
//! pending queue. Results say which path was taken.

pub mod service;

pub use service::{DataError, ListService, ReadOutcome, WriteOutcome};
