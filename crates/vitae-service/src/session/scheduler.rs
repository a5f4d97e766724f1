//! Periodic sweep of expired sessions.

use super::{SessionCache, TokenCleanupService};
use crate::metrics::SessionMetrics;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use vitae_core::{VitaeError, VitaeResult};

/// Sweep statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Completed sweeps.
    pub sweeps_run: u64,
    /// Tokens removed from the store by the last sweep.
    pub last_cleaned: u64,
    /// Tokens removed from the store since start.
    pub total_cleaned: u64,
    /// Completion time of the last sweep.
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Runs `TokenCleanupService` on a fixed interval.
///
/// Sweeps never overlap: a slow sweep delays the next tick instead of
/// queueing another one.
pub struct SweepScheduler {
    cleanup: TokenCleanupService,
    cache: Arc<SessionCache>,
    interval: Duration,
    running: Arc<AtomicBool>,
    stats: Arc<RwLock<SweepStats>>,
}

impl SweepScheduler {
    /// Creates a scheduler. Nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(cleanup: TokenCleanupService, cache: Arc<SessionCache>, interval: Duration) -> Self {
        Self {
            cleanup,
            cache,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RwLock::new(SweepStats::default())),
        }
    }

    /// Sweep interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the sweep task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the sweep statistics.
    #[must_use]
    pub fn stats(&self) -> SweepStats {
        self.stats.read().clone()
    }

    /// Spawns the sweep task. The first sweep runs one interval from now.
    pub fn start(&self) -> VitaeResult<SweepHandle> {
        if self.interval.is_zero() {
            return Err(VitaeError::configuration("sweep interval must be positive"));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(VitaeError::internal("Sweep scheduler already running"));
        }

        info!(interval_secs = self.interval.as_secs(), "Starting session sweep scheduler");

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let cleanup = self.cleanup.clone();
        let cache = Arc::clone(&self.cache);
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Sweep scheduler received shutdown signal");
                        break;
                    }

                    _ = ticker.tick() => {
                        let cleaned = cleanup.scheduled_cleanup().await;
                        let stale = cache.evict_stale();
                        debug!(cleaned, stale, "Session sweep completed");

                        {
                            let mut stats = stats.write();
                            stats.sweeps_run += 1;
                            stats.last_cleaned = cleaned;
                            stats.total_cleaned += cleaned;
                            stats.last_run_at = Some(Utc::now());
                        }
                        SessionMetrics::sweep_completed();
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Sweep scheduler stopped");
        });

        Ok(SweepHandle { shutdown_tx, task })
    }
}

/// Handle to a running sweep task.
pub struct SweepHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signals the task to stop and waits for it. A sweep in progress completes first.
    pub async fn stop(self) {
        info!("Stopping sweep scheduler...");
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sweep task ended abnormally");
        }
    }
}
