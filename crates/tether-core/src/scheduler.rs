//! Periodic timers that feed the job queue.
//!
//! Sync timers only enqueue; workers execute. A slow job therefore never
//! delays the next tick, and missed ticks are delayed rather than replayed in
//! a burst. The probe timer is driven by the coordinator on its own task.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::config::CoordinatorConfig;
use crate::connectivity::ConnectivityHandle;
use crate::models::SyncJob;

/// Bounded, non-blocking sender side of the job queue.
#[derive(Clone, Debug)]
pub struct JobQueue {
    tx: mpsc::Sender<SyncJob>,
}

impl JobQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Returns `false` when the job was dropped.
    pub fn enqueue(&self, job: SyncJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => {
                tracing::debug!(job = %job, "Job queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(job = %job, "Job queue full; dropping job for this cycle");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(job = %job, "Job queue closed; dropping job");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncScheduler {
    connectivity: ConnectivityHandle,
    queue: JobQueue,
    probe_interval: Duration,
    incremental_interval: Duration,
    full_interval: Duration,
}

impl SyncScheduler {
    pub fn new(connectivity: ConnectivityHandle, queue: JobQueue, config: &CoordinatorConfig) -> Self {
        Self {
            connectivity,
            queue,
            probe_interval: config.probe_interval,
            incremental_interval: config.incremental_interval,
            full_interval: config.full_interval,
        }
    }

    pub const fn interval_for(&self, job: SyncJob) -> Duration {
        match job {
            SyncJob::Probe => self.probe_interval,
            SyncJob::Incremental => self.incremental_interval,
            SyncJob::Full => self.full_interval,
        }
    }

    /// Spawn the incremental and full timers. Both stop when `shutdown` flips.
    pub fn spawn(self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        [SyncJob::Incremental, SyncJob::Full]
            .into_iter()
            .map(|job| {
                let scheduler = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { scheduler.run_timer(job, shutdown).await })
            })
            .collect()
    }

    async fn run_timer(self, job: SyncJob, mut shutdown: watch::Receiver<bool>) {
        let period = self.interval_for(job);
        let mut ticker = ticker(job, period);
        tracing::debug!(job = %job, ?period, "Timer started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.fire(job).await;
                }
            }
        }
        tracing::debug!(job = %job, "Timer stopped");
    }

    /// Handle one tick: sync jobs are skipped while offline.
    pub async fn fire(&self, job: SyncJob) -> bool {
        if job.is_sync() {
            match self.connectivity.is_online().await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(job = %job, "Offline; skipping scheduled sync");
                    return false;
                }
                Err(error) => {
                    tracing::warn!(job = %job, %error, "Connectivity unavailable; skipping tick");
                    return false;
                }
            }
        }
        self.queue.enqueue(job)
    }
}

/// Timer for `job`: probes tick immediately, sync jobs wait one period.
pub(crate) fn ticker(job: SyncJob, period: Duration) -> Interval {
    let start = if job.is_sync() {
        Instant::now() + period
    } else {
        Instant::now()
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
