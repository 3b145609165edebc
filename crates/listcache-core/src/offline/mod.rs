//! Offline support: cached list data and a replay queue for failed writes.
//!
//! This module provides:
//! - `SyncManager`: owns the persisted snapshot and pending queue, replays
//!   queued writes with bounded retries
//! - `SyncScheduler`: drives `SyncManager` from a timer and from
//!   connectivity signals
//!
//! Both collections live in a `KeyValueStore` under two independent keys
//! and survive restarts. A queued write is replayed at most
//! `max_retries` times (default 3) and then dropped.

pub mod manager;
pub mod queue;
pub mod scheduler;
pub mod snapshot;

pub use manager::{
    DrainOutcome, DrainReport, SkipReason, SyncManager, SyncSettings, DEFAULT_MAX_RETRIES,
    DEFAULT_SYNC_INTERVAL_SECS, OFFLINE_DATA_KEY, PENDING_UPDATES_KEY,
};
pub use queue::{MutationMethod, PendingMutation};
pub use scheduler::{ConnectivitySignal, SyncScheduler};
pub use snapshot::CachedSnapshot;
