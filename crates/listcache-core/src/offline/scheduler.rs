use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::SyncManager;

/// Buffer size for connectivity signals. They are tiny and handled quickly;
/// a sender only waits while a drain is running.
const SIGNAL_BUFFER_SIZE: usize = 16;

/// Network reachability change reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivitySignal {
    Gained,
    Lost,
}

/// Background task draining the pending queue on a fixed interval and on
/// connectivity changes.
pub struct SyncScheduler {
    signals: mpsc::Sender<ConnectivitySignal>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Start the loop on the current tokio runtime, ticking every
    /// `sync_interval` from the manager's settings
    pub fn spawn(manager: Arc<SyncManager>) -> Self {
        let period = manager.settings().sync_interval;
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER_SIZE);
        let task = tokio::spawn(run(manager, rx, period));
        Self { signals: tx, task }
    }

    /// Deliver a connectivity signal to the loop
    pub async fn signal(&self, signal: ConnectivitySignal) {
        if let Err(e) = self.signals.send(signal).await {
            error!(error = %e, "Failed to deliver connectivity signal - sync loop stopped");
        }
    }

    /// Stop the loop after it has handled every signal already sent
    pub async fn shutdown(self) {
        drop(self.signals);
        if let Err(e) = self.task.await {
            error!(error = %e, "Sync loop ended abnormally");
        }
    }
}

async fn run(manager: Arc<SyncManager>, mut signals: mpsc::Receiver<ConnectivitySignal>, period: Duration) {
    info!(interval_secs = period.as_secs(), "Sync loop started");

    // First tick one full period after start, not immediately
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if manager.is_connected() {
                    let outcome = manager.drain_pending_queue().await;
                    debug!(?outcome, "Periodic sync finished");
                }
            }
            signal = signals.recv() => match signal {
                Some(ConnectivitySignal::Gained) => {
                    manager.connectivity_gained().await;
                }
                Some(ConnectivitySignal::Lost) => manager.connectivity_lost(),
                None => break,
            },
        }
    }

    info!("Sync loop stopped");
}
