//! listcache core - offline-first client for collecting shopping lists.
//!
//! Retail staff work through shopping lists on tablets with patchy network.
//! This crate keeps that work going offline:
//!
//! - `api`: HTTP access to the list backend and its routes
//! - `offline`: cached list snapshot plus a persisted queue of failed writes,
//!   replayed with bounded retries when connectivity returns
//! - `data`: read/write operations that fall back to the offline layer
//! - `storage`: durable key-value stores backing the offline layer
//! - `models`, `config`, `context`: list types, settings, process wiring

pub mod api;
pub mod config;
pub mod context;
pub mod data;
pub mod models;
pub mod offline;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, Transport};
pub use config::Config;
pub use context::AppContext;
pub use data::{DataError, ListService, ReadOutcome, WriteOutcome};
pub use offline::{
    CachedSnapshot, ConnectivitySignal, DrainOutcome, DrainReport, PendingMutation, SkipReason,
    SyncManager, SyncScheduler, SyncSettings,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
