//! The offline sync manager.
//!
//! Owns the two persisted collections (list snapshot and pending queue) and
//! the replay of queued writes. One instance is shared per process behind an
//! `Arc`; tests build their own over a `MemoryStore`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{CachedSnapshot, PendingMutation};
use crate::api::Transport;
use crate::storage::KeyValueStore;

// ============================================================================
// Constants
// ============================================================================

/// Storage key of the cached list snapshot
pub const OFFLINE_DATA_KEY: &str = "listcache_offline_data";

/// Storage key of the pending mutation queue
pub const PENDING_UPDATES_KEY: &str = "listcache_pending_updates";

/// A queued write is discarded once it has failed this many replays.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Period of the background sync loop.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub max_retries: u32,
    pub sync_interval: Duration,
    /// Connectivity assumed before the first signal arrives
    pub start_connected: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            start_connected: true,
        }
    }
}

/// Result of one drain call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Skipped(SkipReason),
    Completed(DrainReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

/// What happened to the mutations a drain picked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub replayed: usize,
    pub retained: usize,
    pub discarded: usize,
}

/// Clears the in-progress flag on every exit path.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncManager {
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    settings: SyncSettings,
    online: AtomicBool,
    syncing: AtomicBool,
    /// Serializes read-modify-write of the pending queue. Never held across an await.
    queue_lock: Mutex<()>,
}

impl SyncManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        settings: SyncSettings,
    ) -> Self {
        let online = AtomicBool::new(settings.start_connected);
        Self {
            store,
            transport,
            settings,
            online,
            syncing: AtomicBool::new(false),
            queue_lock: Mutex::new(()),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    // ===== Storage helpers =====

    /// Load and decode a stored value. Missing, unreadable and malformed
    /// values all come back as `None`.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let contents = match self.store.get(key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read offline storage");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key, error = %e, "Ignoring malformed offline data");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let contents = serde_json::to_string(value)
            .with_context(|| format!("Failed to encode {}", key))?;
        self.store
            .set(key, &contents)
            .with_context(|| format!("Failed to write {}", key))?;
        Ok(())
    }

    fn lock_queue(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock carries no broken state
        self.queue_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_queue(&self) -> Vec<PendingMutation> {
        self.load(PENDING_UPDATES_KEY).unwrap_or_default()
    }

    // ===== Snapshot =====

    /// Replace the cached snapshot with freshly fetched records
    pub fn record_snapshot(&self, records: Vec<Value>) {
        let count = records.len();
        let snapshot = CachedSnapshot::new(records);
        match self.save(OFFLINE_DATA_KEY, &snapshot) {
            Ok(()) => debug!(count = count, "Stored list snapshot"),
            Err(e) => error!(error = %format!("{:#}", e), "Failed to store list snapshot"),
        }
    }

    pub fn load_snapshot(&self) -> Option<CachedSnapshot> {
        self.load(OFFLINE_DATA_KEY)
    }

    /// Records of the last successful fetch, or empty if there is none
    pub fn read_snapshot(&self) -> Vec<Value> {
        self.load_snapshot()
            .map(|snapshot| snapshot.records)
            .unwrap_or_default()
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.load_snapshot().map(|snapshot| snapshot.last_sync)
    }

    // ===== Pending queue =====

    /// Queue a write for later replay and persist the queue immediately
    pub fn enqueue_mutation(&self, path: impl Into<String>, body: Value) -> Uuid {
        let mutation = PendingMutation::new(path, body);
        let id = mutation.id;

        let _lock = self.lock_queue();
        let mut queue = self.read_queue();
        info!(path = %mutation.path, queued = queue.len() + 1, "Update queued for sync");
        queue.push(mutation);
        if let Err(e) = self.save(PENDING_UPDATES_KEY, &queue) {
            error!(error = %format!("{:#}", e), "Failed to persist pending queue");
        }

        id
    }

    pub fn pending_mutations(&self) -> Vec<PendingMutation> {
        self.read_queue()
    }

    pub fn pending_count(&self) -> usize {
        self.read_queue().len()
    }

    // ===== Connectivity =====

    pub fn is_connected(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Mark the network reachable. Coming back from offline drains the queue
    /// right away; the returned outcome is that drain's.
    pub async fn connectivity_gained(&self) -> Option<DrainOutcome> {
        let was_online = self.online.swap(true, Ordering::AcqRel);
        if was_online {
            return None;
        }
        info!("Connection restored - syncing offline data");
        Some(self.drain_pending_queue().await)
    }

    pub fn connectivity_lost(&self) {
        if self.online.swap(false, Ordering::AcqRel) {
            info!("Connection lost - working offline");
        }
    }

    // ===== Sync =====

    /// Replay every queued mutation once, in enqueue order.
    ///
    /// No-op while offline or while another drain is running.
    pub async fn drain_pending_queue(&self) -> DrainOutcome {
        if !self.is_connected() {
            debug!("Offline, not syncing");
            return DrainOutcome::Skipped(SkipReason::Offline);
        }

        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            debug!("Sync already in progress");
            return DrainOutcome::Skipped(SkipReason::AlreadyRunning);
        };

        let pending = {
            let _lock = self.lock_queue();
            self.read_queue()
        };
        if pending.is_empty() {
            return DrainOutcome::Completed(DrainReport::default());
        }

        info!(count = pending.len(), "Syncing pending updates");
        let picked_up = pending.len();

        let mut report = DrainReport::default();
        let mut retained = Vec::with_capacity(pending.len());

        for mut mutation in pending {
            if mutation.retry_count >= self.settings.max_retries {
                error!(
                    path = %mutation.path,
                    id = %mutation.id,
                    retry = mutation.retry_count,
                    "Stored update already exhausted its retries, discarding"
                );
                report.discarded += 1;
                continue;
            }

            match self.replay(&mutation).await {
                Ok(()) => {
                    report.replayed += 1;
                    info!(path = %mutation.path, "Synced queued update");
                }
                Err(reason) => {
                    mutation.retry_count = mutation.retry_count.saturating_add(1);
                    if mutation.retry_count < self.settings.max_retries {
                        warn!(
                            path = %mutation.path,
                            retry = mutation.retry_count,
                            max_retries = self.settings.max_retries,
                            error = %reason,
                            "Failed to sync queued update, will retry"
                        );
                        report.retained += 1;
                        retained.push(mutation);
                    } else {
                        error!(
                            path = %mutation.path,
                            id = %mutation.id,
                            error = %reason,
                            "Max retries exceeded, discarding queued update"
                        );
                        report.discarded += 1;
                    }
                }
            }
        }

        self.persist_after_drain(retained, picked_up);

        if report.retained == 0 {
            info!(replayed = report.replayed, discarded = report.discarded, "Offline queue drained");
        } else {
            info!(retained = report.retained, "Some updates failed, will retry later");
        }

        DrainOutcome::Completed(report)
    }

    /// User-initiated sync
    pub async fn trigger_sync(&self) -> DrainOutcome {
        if !self.is_connected() {
            warn!("Cannot sync while offline");
            return DrainOutcome::Skipped(SkipReason::Offline);
        }
        self.drain_pending_queue().await
    }

    /// Replay one mutation. A panicking transport counts as a failed replay
    /// so the rest of the queue still gets its turn.
    async fn replay(&self, mutation: &PendingMutation) -> std::result::Result<(), String> {
        let attempt = self.transport.perform_write(&mutation.path, &mutation.body);
        match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("transport panicked".to_string()),
        }
    }

    /// Write back the survivors of a drain as the whole queue. Mutations
    /// enqueued while the drain was in flight are kept behind them.
    ///
    /// Only enqueue writes the queue while a drain runs, and it only appends,
    /// so whatever is stored past the first `picked_up` entries arrived during
    /// the drain. Stored entries without an id get a fresh one on every load.
    fn persist_after_drain(&self, mut retained: Vec<PendingMutation>, picked_up: usize) {
        let _lock = self.lock_queue();
        let arrived: Vec<PendingMutation> = self.read_queue().into_iter().skip(picked_up).collect();
        if !arrived.is_empty() {
            debug!(count = arrived.len(), "Keeping updates queued during sync");
        }
        retained.extend(arrived);

        if let Err(e) = self.save(PENDING_UPDATES_KEY, &retained) {
            error!(error = %format!("{:#}", e), "Failed to persist pending queue after sync");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
