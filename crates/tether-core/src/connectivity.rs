//! Connectivity state actor.
//!
//! A single task owns the online/offline flag. Probes report results and
//! everyone else reads the flag through a cloneable [`ConnectivityHandle`];
//! nothing shares the flag directly.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::util::unix_timestamp_millis;

const COMMAND_BUFFER: usize = 32;

/// Edge produced by recording one probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConnectivitySnapshot {
    pub online: bool,
    /// Unix ms of the last recorded probe
    pub last_probe_at: Option<i64>,
    /// Unix ms of the last online/offline flip
    pub last_transition_at: Option<i64>,
    pub transitions: u64,
}

enum Command {
    IsOnline(oneshot::Sender<bool>),
    Snapshot(oneshot::Sender<ConnectivitySnapshot>),
    Record {
        reachable: bool,
        reply: oneshot::Sender<Transition>,
    },
}

/// Cloneable handle to the connectivity actor.
#[derive(Clone, Debug)]
pub struct ConnectivityHandle {
    tx: mpsc::Sender<Command>,
}

impl ConnectivityHandle {
    /// Spawn the actor, starting offline.
    ///
    /// The actor exits once every handle has been dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = ConnectivityActor {
            state: ConnectivitySnapshot::default(),
            rx,
        };
        let task = tokio::spawn(actor.run());
        (Self { tx }, task)
    }

    pub async fn is_online(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::IsOnline(reply)).await?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn snapshot(&self) -> Result<ConnectivitySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Record a probe result and return the edge it caused.
    pub async fn record_probe(&self, reachable: bool) -> Result<Transition> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Record { reachable, reply }).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| stopped())
    }
}

const fn stopped() -> Error {
    Error::CoordinatorStopped("connectivity actor")
}

struct ConnectivityActor {
    state: ConnectivitySnapshot,
    rx: mpsc::Receiver<Command>,
}

impl ConnectivityActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::IsOnline(reply) => {
                    let _ = reply.send(self.state.online);
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.state);
                }
                Command::Record { reachable, reply } => {
                    let transition = self.apply(reachable, unix_timestamp_millis());
                    let _ = reply.send(transition);
                }
            }
        }
        tracing::debug!("Connectivity actor stopped");
    }

    fn apply(&mut self, reachable: bool, now_ms: i64) -> Transition {
        self.state.last_probe_at = Some(now_ms);
        if reachable == self.state.online {
            return Transition::Unchanged;
        }

        self.state.online = reachable;
        self.state.last_transition_at = Some(now_ms);
        self.state.transitions += 1;
        if reachable {
            tracing::info!("Primary endpoint reachable; switching to online");
            Transition::CameOnline
        } else {
            tracing::info!("Primary endpoint unreachable; switching to offline");
            Transition::WentOffline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_offline_without_history() {
        let (handle, _task) = ConnectivityHandle::spawn();
        assert!(!handle.is_online().await.unwrap());

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot, ConnectivitySnapshot::default());
    }

    #[tokio::test]
    async fn success_then_failure_toggles_exactly_twice() {
        let (handle, _task) = ConnectivityHandle::spawn();

        assert_eq!(
            handle.record_probe(true).await.unwrap(),
            Transition::CameOnline
        );
        assert!(handle.is_online().await.unwrap());
        assert_eq!(
            handle.record_probe(false).await.unwrap(),
            Transition::WentOffline
        );
        assert!(!handle.is_online().await.unwrap());

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.transitions, 2);
        assert!(snapshot.last_probe_at.is_some());
        assert!(snapshot.last_transition_at.is_some());
    }

    #[tokio::test]
    async fn repeated_results_do_not_produce_edges() {
        let (handle, _task) = ConnectivityHandle::spawn();

        assert_eq!(
            handle.record_probe(false).await.unwrap(),
            Transition::Unchanged
        );
        assert_eq!(
            handle.record_probe(true).await.unwrap(),
            Transition::CameOnline
        );
        assert_eq!(
            handle.record_probe(true).await.unwrap(),
            Transition::Unchanged
        );
        assert_eq!(handle.snapshot().await.unwrap().transitions, 1);
    }

    #[tokio::test]
    async fn clones_observe_the_same_state() {
        let (handle, _task) = ConnectivityHandle::spawn();
        let reader = handle.clone();

        handle.record_probe(true).await.unwrap();
        assert!(reader.is_online().await.unwrap());
    }

    #[tokio::test]
    async fn actor_exits_when_handles_dropped() {
        let (handle, task) = ConnectivityHandle::spawn();
        drop(handle);
        task.await.expect("actor task should finish cleanly");
    }
}
