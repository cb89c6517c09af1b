//! Expiry Sweeper
//!
//! Periodic purge of trash entries past their expiry. A sweep moves
//! `Idle -> Scanning -> Purging -> Idle`; one entry failing to purge is logged
//! and skipped, and the next scheduled sweep retries it. A stop request is
//! honored between entries and belongs to one background run only.

use super::TrashStore;
use crate::error::FsError;
use crate::types::TrashEntryId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What the sweeper needs from the trash
pub trait ExpiredTrash: Send + Sync {
    fn expired_ids(&self, now: DateTime<Utc>) -> Result<Vec<TrashEntryId>, FsError>;

    /// Purge one entry if it is still present and still expired
    fn purge_if_expired(&self, id: TrashEntryId, now: DateTime<Utc>) -> Result<bool, FsError>;
}

impl ExpiredTrash for TrashStore {
    fn expired_ids(&self, now: DateTime<Utc>) -> Result<Vec<TrashEntryId>, FsError> {
        TrashStore::expired_ids(self, now)
    }

    fn purge_if_expired(&self, id: TrashEntryId, now: DateTime<Utc>) -> Result<bool, FsError> {
        TrashStore::purge_if_expired(self, id, now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweeperState {
    Idle,
    Scanning,
    Purging,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub purged: usize,
    /// Restored or purged by someone else between scan and purge
    pub already_gone: usize,
    pub failed: usize,
    pub interrupted: bool,
    /// The scan itself failed; nothing was purged
    pub scan_error: Option<String>,
}

pub struct ExpirySweeper {
    trash: Arc<dyn ExpiredTrash>,
    state: RwLock<SweeperState>,
    last_report: RwLock<Option<SweepReport>>,
}

impl ExpirySweeper {
    pub fn new(trash: Arc<dyn ExpiredTrash>) -> Self {
        Self {
            trash,
            state: RwLock::new(SweeperState::Idle),
            last_report: RwLock::new(None),
        }
    }

    pub fn state(&self) -> SweeperState {
        *self.state.read()
    }

    pub fn last_report(&self) -> Option<SweepReport> {
        self.last_report.read().clone()
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        self.sweep_until_stopped(now, &AtomicBool::new(false))
    }

    /// Sweep, checking `stop` before the purge phase and between entries
    pub fn sweep_until_stopped(&self, now: DateTime<Utc>, stop: &AtomicBool) -> SweepReport {
        let mut report = SweepReport::default();
        *self.state.write() = SweeperState::Scanning;

        let ids = match self.trash.expired_ids(now) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Trash sweep scan failed, will retry next cycle");
                report.scan_error = Some(e.to_string());
                return self.finish(report);
            }
        };
        report.scanned = ids.len();
        debug!(expired = ids.len(), "Trash sweep scan complete");

        if stop.load(Ordering::SeqCst) {
            report.interrupted = true;
            return self.finish(report);
        }

        *self.state.write() = SweeperState::Purging;
        for id in ids {
            if stop.load(Ordering::SeqCst) {
                report.interrupted = true;
                break;
            }
            match self.trash.purge_if_expired(id, now) {
                Ok(true) => report.purged += 1,
                Ok(false) => report.already_gone += 1,
                Err(e) => {
                    warn!(trash_id = %id, error = %e, "Failed to purge expired trash entry");
                    report.failed += 1;
                }
            }
        }

        self.finish(report)
    }

    fn finish(&self, report: SweepReport) -> SweepReport {
        *self.state.write() = SweeperState::Idle;
        info!(
            scanned = report.scanned,
            purged = report.purged,
            already_gone = report.already_gone,
            failed = report.failed,
            interrupted = report.interrupted,
            "Trash sweep finished"
        );
        *self.last_report.write() = Some(report.clone());
        report
    }

    /// Run sweeps on a fixed interval until the handle is shut down
    ///
    /// With `run_on_start` the first sweep happens immediately as a catch-up.
    pub fn start(self: Arc<Self>, interval: Duration, run_on_start: bool) -> SweeperHandle {
        let shutdown = Arc::new(Notify::new());
        let stop = Arc::new(AtomicBool::new(false));
        let sweeper = Arc::clone(&self);
        let notified = Arc::clone(&shutdown);
        let stopped = Arc::clone(&stop);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if !run_on_start {
                // The first tick completes immediately.
                ticker.tick().await;
            }
            info!(interval_secs = interval.as_secs(), "Trash sweeper started");

            loop {
                tokio::select! {
                    _ = notified.notified() => break,
                    _ = ticker.tick() => {
                        if stopped.load(Ordering::SeqCst) {
                            break;
                        }
                        let worker = Arc::clone(&sweeper);
                        let flag = Arc::clone(&stopped);
                        let sweep = move || worker.sweep_until_stopped(Utc::now(), &flag);
                        if let Err(e) = tokio::task::spawn_blocking(sweep).await {
                            error!(error = %e, "Trash sweep task panicked");
                        }
                    }
                }
            }
            info!("Trash sweeper stopped");
        });

        SweeperHandle {
            sweeper: self,
            shutdown,
            stop,
            task,
        }
    }
}

/// Handle to a running sweeper task
pub struct SweeperHandle {
    sweeper: Arc<ExpirySweeper>,
    shutdown: Arc<Notify>,
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn sweeper(&self) -> &Arc<ExpirySweeper> {
        &self.sweeper
    }

    /// Ask this run's in-flight sweep to stop at the next entry boundary
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Interrupt any in-flight sweep and wait for the task to exit
    ///
    /// The sweeper itself stays usable for direct sweeps and later runs.
    pub async fn shutdown(self) {
        self.request_stop();
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            error!(error = %e, "Trash sweeper task ended abnormally");
        }
    }
}
