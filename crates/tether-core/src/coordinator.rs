//! Coordinator lifecycle: wires the connectivity actor, probe, timers and the
//! worker pool together, and exposes status, manual triggers and job reports.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::auth::AuthToken;
use crate::config::CoordinatorConfig;
use crate::connectivity::{ConnectivityHandle, ConnectivitySnapshot};
use crate::dispatcher::RequestDispatcher;
use crate::error::Result;
use crate::models::{JobReport, SyncJob};
use crate::probe::{ConnectivityProbe, ProbeReport};
use crate::scheduler::{ticker, JobQueue, SyncScheduler};
use crate::transport::{ReqwestTransport, Transport};
use crate::util::unix_timestamp_millis;

const REPORT_BUFFER: usize = 64;

/// Point-in-time view of the coordinator
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub connectivity: ConnectivitySnapshot,
    /// Unix ms
    pub started_at: i64,
    pub last_probe: Option<ProbeReport>,
    pub last_full: Option<JobReport>,
    pub last_incremental: Option<JobReport>,
    pub jobs_completed: u64,
    pub jobs_abandoned: u64,
}

#[derive(Debug, Default)]
struct StatusBook {
    last_probe: Option<ProbeReport>,
    last_full: Option<JobReport>,
    last_incremental: Option<JobReport>,
    jobs_completed: u64,
    jobs_abandoned: u64,
}

/// Everything a worker needs to run one job.
struct Worker<T: Transport> {
    dispatcher: RequestDispatcher<T>,
    probe: Arc<ConnectivityProbe<T>>,
    reports: broadcast::Sender<JobReport>,
    book: Arc<Mutex<StatusBook>>,
}

impl<T: Transport> Clone for Worker<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            probe: Arc::clone(&self.probe),
            reports: self.reports.clone(),
            book: Arc::clone(&self.book),
        }
    }
}

impl<T: Transport> Worker<T> {
    async fn run(&self, job: SyncJob) {
        if job == SyncJob::Probe {
            match self.probe.probe_once().await {
                Ok(report) => self.book.lock().await.last_probe = Some(report),
                Err(error) => tracing::warn!(%error, "Probe abandoned"),
            }
            return;
        }

        match self.dispatcher.dispatch(job).await {
            Ok(report) => {
                {
                    let mut book = self.book.lock().await;
                    book.jobs_completed += 1;
                    match job {
                        SyncJob::Full => book.last_full = Some(report.clone()),
                        SyncJob::Incremental => book.last_incremental = Some(report.clone()),
                        SyncJob::Probe => {}
                    }
                }
                // No subscribers is fine.
                let _ = self.reports.send(report);
            }
            Err(error) => {
                self.book.lock().await.jobs_abandoned += 1;
                tracing::warn!(job = %job, %error, "Job abandoned for this cycle");
            }
        }
    }
}

/// Running background sync coordinator.
///
/// Dropping the coordinator signals every task to stop; call
/// [`SyncCoordinator::shutdown`] to also wait for in-flight jobs.
pub struct SyncCoordinator {
    connectivity: ConnectivityHandle,
    queue: JobQueue,
    auth_token: AuthToken,
    reports: broadcast::Sender<JobReport>,
    book: Arc<Mutex<StatusBook>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    started_at: i64,
}

impl SyncCoordinator {
    /// Start with the HTTP transport built from `config`.
    pub fn connect(config: CoordinatorConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.connect_timeout)?;
        Self::start(config, transport)
    }

    /// Spawn the actor, timers and worker pool. Must be called inside a
    /// tokio runtime.
    pub fn start<T: Transport>(config: CoordinatorConfig, transport: T) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            primary = config.endpoint.primary(),
            backup = config.endpoint.backup(),
            "Starting sync coordinator"
        );

        let transport = Arc::new(transport);
        let (connectivity, actor_task) = ConnectivityHandle::spawn();
        let (queue, queue_rx) = JobQueue::channel(config.queue_capacity);
        let auth_token = AuthToken::new(config.auth_token.clone());
        let (reports, _) = broadcast::channel(REPORT_BUFFER);
        let book = Arc::new(Mutex::new(StatusBook::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let probe = ConnectivityProbe::new(
            Arc::clone(&transport),
            &config.endpoint,
            config.probe_timeout,
            connectivity.clone(),
            auth_token.clone(),
        )
        .with_catch_up(queue.clone());
        let dispatcher = RequestDispatcher::new(
            transport,
            config.endpoint.clone(),
            connectivity.clone(),
            auth_token.clone(),
            config.request_timeout,
        );
        let worker = Worker {
            dispatcher,
            probe: Arc::new(probe),
            reports: reports.clone(),
            book: Arc::clone(&book),
        };

        // The probe runs on its own task so busy workers never delay it.
        let mut tasks = vec![
            actor_task,
            tokio::spawn(run_probe_timer(
                worker.clone(),
                config.probe_interval,
                shutdown_rx.clone(),
            )),
        ];
        tasks.extend(
            SyncScheduler::new(connectivity.clone(), queue.clone(), &config).spawn(&shutdown_rx),
        );
        tasks.push(tokio::spawn(run_worker_pool(
            queue_rx,
            worker,
            config.worker_pool_size,
            shutdown_rx,
        )));

        Ok(Self {
            connectivity,
            queue,
            auth_token,
            reports,
            book,
            shutdown_tx,
            tasks,
            started_at: unix_timestamp_millis(),
        })
    }

    pub async fn is_online(&self) -> Result<bool> {
        self.connectivity.is_online().await
    }

    /// Queue a job immediately, bypassing the timers and the online gate.
    pub fn trigger(&self, job: SyncJob) -> bool {
        self.queue.enqueue(job)
    }

    /// Receive every sync job report from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobReport> {
        self.reports.subscribe()
    }

    pub async fn set_auth_token(&self, token: impl Into<String>) {
        self.auth_token.set(token).await;
    }

    pub async fn clear_auth_token(&self) {
        self.auth_token.clear().await;
    }

    pub async fn status(&self) -> Result<CoordinatorStatus> {
        let connectivity = self.connectivity.snapshot().await?;
        let book = self.book.lock().await;
        Ok(CoordinatorStatus {
            connectivity,
            started_at: self.started_at,
            last_probe: book.last_probe.clone(),
            last_full: book.last_full.clone(),
            last_incremental: book.last_incremental.clone(),
            jobs_completed: book.jobs_completed,
            jobs_abandoned: book.jobs_abandoned,
        })
    }

    /// Stop the timers, let in-flight jobs finish, then stop the actor.
    pub async fn shutdown(mut self) {
        tracing::info!("Stopping sync coordinator");
        let _ = self.shutdown_tx.send(true);

        // The actor is first in the list and only exits once every handle
        // is gone, so wait on it last.
        let mut tasks = std::mem::take(&mut self.tasks);
        let actor = if tasks.is_empty() {
            None
        } else {
            Some(tasks.remove(0))
        };
        for task in tasks {
            if let Err(error) = task.await {
                tracing::warn!(%error, "Coordinator task ended abnormally");
            }
        }
        drop(self);
        if let Some(actor) = actor {
            let _ = actor.await;
        }
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run_probe_timer<T: Transport>(
    worker: Worker<T>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = ticker(SyncJob::Probe, period);
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                worker.run(SyncJob::Probe).await;
            }
        }
    }
    tracing::debug!("Probe timer stopped");
}

async fn run_worker_pool<T: Transport>(
    mut queue_rx: mpsc::Receiver<SyncJob>,
    worker: Worker<T>,
    pool_size: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let permits = Arc::new(Semaphore::new(pool_size));
    let mut in_flight = JoinSet::new();
    // A job is only taken off the queue once a permit is held.
    let mut permit: Option<OwnedSemaphorePermit> = None;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            acquired = Arc::clone(&permits).acquire_owned(), if permit.is_none() => {
                let Ok(acquired) = acquired else { break };
                permit = Some(acquired);
            }
            job = queue_rx.recv(), if permit.is_some() => {
                let Some(job) = job else { break };
                let Some(held) = permit.take() else { continue };
                let worker = worker.clone();
                in_flight.spawn(async move {
                    let _permit = held;
                    worker.run(job).await;
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(error) = joined {
                    tracing::error!(%error, "Job task panicked");
                }
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(error) = joined {
            tracing::error!(%error, "Job task panicked");
        }
    }
    tracing::debug!("Worker pool stopped");
}
